/// f64 wrapper that displays minimal decimal places.
#[derive(Debug, Clone, Copy)]
pub struct TerseF64(pub f64);

impl std::fmt::Display for TerseF64 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if pseudo_int(self.0) {
            write!(f, "{:.0}", self.0)
        } else if pseudo_int(self.0 * 10.0) {
            write!(f, "{:.1}", self.0)
        } else if pseudo_int(self.0 * 100.0) {
            write!(f, "{:.2}", self.0)
        } else {
            self.0.fmt(f)
        }
    }
}

#[inline]
fn pseudo_int(f: f64) -> bool {
    !(0.0002..=0.9998).contains(&f.fract())
}

/// Round down to `dp` decimal places.
pub fn floor_dp(n: f64, dp: u32) -> f64 {
    let m = 10f64.powi(dp as i32);
    (n * m).floor() / m
}

/// Round up to `dp` decimal places.
pub fn ceil_dp(n: f64, dp: u32) -> f64 {
    let m = 10f64.powi(dp as i32);
    (n * m).ceil() / m
}

#[test]
fn terse_display() {
    assert_eq!(TerseF64(2.0).to_string(), "2");
    assert_eq!(TerseF64(2.5).to_string(), "2.5");
    assert_eq!(TerseF64(29.98).to_string(), "29.98");
    assert_eq!(TerseF64(0.5).to_string(), "0.5");
}

#[test]
fn floor_dp_3() {
    assert_eq!(floor_dp(9.966_666_666, 3), 9.966);
    assert_eq!(floor_dp(10.0, 3), 10.0);
}

#[test]
fn ceil_dp_2() {
    assert_eq!(ceil_dp(29.970_029_97, 2), 29.98);
    assert_eq!(ceil_dp(30.0, 2), 30.0);
    assert_eq!(ceil_dp(23.976_023_976, 2), 23.98);
}
