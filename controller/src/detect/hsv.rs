use blob_servo_common::config::DetectorConfig;

/// 8-bit hue/saturation/value triple on the OpenCV scale:
/// hue is degrees halved (0..180), saturation and value are 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }

    /// Convert one RGB pixel.
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        let (r, g, b) = (r as i32, g as i32, b as i32);
        let v = r.max(g).max(b);
        let min = r.min(g).min(b);
        let diff = v - min;

        if diff == 0 {
            return Self::new(0, 0, v as u8);
        }

        // round(255 * diff / v)
        let s = (510 * diff + v) / (2 * v);

        // Position around the hexcone in units of `diff`, in [-diff, 5*diff).
        let sector = if v == r {
            g - b
        } else if v == g {
            b - r + 2 * diff
        } else {
            r - g + 4 * diff
        };
        // round(sector * 30 / diff), halves rounded up
        let mut h = (60 * sector + diff).div_euclid(2 * diff);
        if h < 0 {
            h += 180;
        }

        Self::new(h as u8, s as u8, v as u8)
    }
}

/// Inclusive box in HSV space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsvRange {
    pub lower: Hsv,
    pub upper: Hsv,
}

impl HsvRange {
    pub fn new(lower: Hsv, upper: Hsv) -> Self {
        Self { lower, upper }
    }

    pub fn from_config(config: &DetectorConfig) -> Self {
        Self {
            lower: Hsv::new(config.hue_min, config.sat_min, config.val_min),
            upper: Hsv::new(config.hue_max, config.sat_max, config.val_max),
        }
    }

    pub fn contains(&self, hsv: Hsv) -> bool {
        (self.lower.h..=self.upper.h).contains(&hsv.h)
            && (self.lower.s..=self.upper.s).contains(&hsv.s)
            && (self.lower.v..=self.upper.v).contains(&hsv.v)
    }

    pub fn contains_rgb(&self, r: u8, g: u8, b: u8) -> bool {
        self.contains(Hsv::from_rgb(r, g, b))
    }
}

impl Default for HsvRange {
    fn default() -> Self {
        Self::from_config(&DetectorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primaries() {
        assert_eq!(Hsv::from_rgb(255, 0, 0), Hsv::new(0, 255, 255));
        assert_eq!(Hsv::from_rgb(0, 255, 0), Hsv::new(60, 255, 255));
        assert_eq!(Hsv::from_rgb(0, 0, 255), Hsv::new(120, 255, 255));
        assert_eq!(Hsv::from_rgb(255, 255, 0), Hsv::new(30, 255, 255));
        assert_eq!(Hsv::from_rgb(255, 0, 255), Hsv::new(150, 255, 255));
    }

    #[test]
    fn greys_have_no_hue_or_saturation() {
        assert_eq!(Hsv::from_rgb(0, 0, 0), Hsv::new(0, 0, 0));
        assert_eq!(Hsv::from_rgb(128, 128, 128), Hsv::new(0, 0, 128));
        assert_eq!(Hsv::from_rgb(255, 255, 255), Hsv::new(0, 0, 255));
    }

    #[test]
    fn magenta_side_of_red_wraps_high() {
        // Slightly blue-ish red sits just below 180, outside the 0..=10 band.
        let hsv = Hsv::from_rgb(255, 0, 40);
        assert!(hsv.h > 170 && hsv.h < 180, "hue was {}", hsv.h);
    }

    #[test]
    fn orange_red_stays_in_low_band() {
        let hsv = Hsv::from_rgb(200, 40, 20);
        assert_eq!(hsv.h, 3);
        assert_eq!(hsv.v, 200);
        assert_eq!(hsv.s, 230);
    }

    #[test]
    fn default_range_selects_saturated_red_only() {
        let range = HsvRange::default();
        assert!(range.contains_rgb(255, 0, 0));
        assert!(range.contains_rgb(120, 30, 20));
        // orange-yellow is past hue 10
        assert!(!range.contains_rgb(255, 128, 0));
        // near-black red fails the value floor
        assert!(!range.contains_rgb(9, 0, 0));
        // washed-out red fails the saturation floor
        assert!(!range.contains_rgb(250, 245, 245));
        assert!(!range.contains_rgb(0, 0, 255));
    }

    #[test]
    fn bounds_are_inclusive() {
        let range = HsvRange::new(Hsv::new(0, 10, 10), Hsv::new(10, 255, 255));
        assert!(range.contains(Hsv::new(10, 10, 10)));
        assert!(range.contains(Hsv::new(0, 255, 255)));
        assert!(!range.contains(Hsv::new(11, 200, 200)));
        assert!(!range.contains(Hsv::new(5, 9, 200)));
    }
}
