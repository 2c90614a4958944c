
/// 标注颜色阈值：蓝色通道必须严格大于该值。
pub const BLUE_THRESHOLD: u8 = 128;

/// 一个按ARGB排列的32位颜色，每个通道8位。
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Argb(pub u32);

impl Argb {
    #[inline]
    pub fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    #[inline]
    pub fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    #[inline]
    pub fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    #[inline]
    pub fn blue(self) -> u8 {
        self.0 as u8
    }

    /// 蓝色通道同时严格大于红、绿通道以及128时，视为蓝色。透明度不参与判断。
    #[inline]
    pub fn is_blue(self) -> bool {
        let blue = self.blue();
        blue > self.red() && blue > self.green() && blue > BLUE_THRESHOLD
    }
}

impl From<u32> for Argb {
    #[inline]
    fn from(v: u32) -> Self {
        Argb(v)
    }
}

impl From<i64> for Argb {
    /// JSON中的颜色既可能是有符号的int32，也可能是无符号值；只取低32位。
    #[inline]
    fn from(v: i64) -> Self {
        Argb(v as u32)
    }
}

#[inline]
pub fn is_blue(color: u32) -> bool {
    Argb(color).is_blue()
}
