use std::fmt;

/// 标注中的原始矩形。宽高带符号，符号表示起始角的位置。
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Region {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

/// 归一化之后以左上角为起点的感兴趣区域（ROI）。
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Roi {
    pub x: i64,
    pub y: i64,
    pub width: u64,
    pub height: u64,
}

impl Region {
    #[inline]
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// 将起点移动到左上角并取宽高的绝对值，覆盖的区域不变。
    ///
    /// 宽或高为负时，起点沿该轴平移同样的距离：
    ///
    /// | width | height | x         | y          |
    /// |-------|--------|-----------|------------|
    /// | +     | +      | x         | y          |
    /// | -     | +      | x + width | y          |
    /// | +     | -      | x         | y + height |
    /// | -     | -      | x + width | y + height |
    ///
    /// 宽或高为0时按正数处理，该轴不平移；得到的ROI面积为0，由读取方拒绝。
    pub fn normalize(self) -> Roi {
        let x = if self.width < 0 {
            self.x.saturating_add(self.width)
        } else {
            self.x
        };
        let y = if self.height < 0 {
            self.y.saturating_add(self.height)
        } else {
            self.y
        };
        Roi {
            x,
            y,
            width: self.width.unsigned_abs(),
            height: self.height.unsigned_abs(),
        }
    }
}

impl From<(i64, i64, i64, i64)> for Region {
    #[inline]
    fn from(r: (i64, i64, i64, i64)) -> Self {
        Region::new(r.0, r.1, r.2, r.3)
    }
}

impl From<Roi> for Region {
    #[inline]
    fn from(roi: Roi) -> Self {
        Region::new(
            roi.x,
            roi.y,
            i64::try_from(roi.width).unwrap_or(i64::MAX),
            i64::try_from(roi.height).unwrap_or(i64::MAX),
        )
    }
}

impl Roi {
    #[inline]
    pub fn new(x: i64, y: i64, width: u64, height: u64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn area(&self) -> u128 {
        self.width as u128 * self.height as u128
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Roi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ROI ({}, {}) {}x{}",
            self.x, self.y, self.width, self.height
        )
    }
}
