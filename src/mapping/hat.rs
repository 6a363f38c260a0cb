//! Hat (POV) angle conversion

/// Wrap an angle into `[0, 360)`; non-finite angles read as centered
pub fn normalize(angle: Option<f32>) -> Option<f32> {
    let angle = angle?;
    if !angle.is_finite() {
        return None;
    }
    Some(angle.rem_euclid(360.0))
}

/// 4-way direction of a hat angle
///
/// Each direction covers a 90° sector centered on its axis, so 44° is still
/// up and 45° is right.
///
/// # Returns
/// `Some(0)` up, `Some(1)` right, `Some(2)` down, `Some(3)` left, `None` centered
pub fn discrete_direction(angle: Option<f32>) -> Option<u8> {
    let angle = normalize(angle)?;
    Some((((angle + 45.0) / 90.0) as u32 % 4) as u8)
}

/// Point the hat the opposite way
pub fn invert(angle: Option<f32>) -> Option<f32> {
    normalize(angle.map(|a| a + 180.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinal_directions() {
        assert_eq!(discrete_direction(Some(0.0)), Some(0));
        assert_eq!(discrete_direction(Some(90.0)), Some(1));
        assert_eq!(discrete_direction(Some(180.0)), Some(2));
        assert_eq!(discrete_direction(Some(270.0)), Some(3));
        assert_eq!(discrete_direction(None), None);
    }

    #[test]
    fn test_sector_edges() {
        assert_eq!(discrete_direction(Some(44.9)), Some(0));
        assert_eq!(discrete_direction(Some(45.0)), Some(1));
        assert_eq!(discrete_direction(Some(315.0)), Some(0));
        assert_eq!(discrete_direction(Some(314.9)), Some(3));
        assert_eq!(discrete_direction(Some(359.9)), Some(0));
    }

    #[test]
    fn test_out_of_range_angles_wrap() {
        assert_eq!(normalize(Some(370.0)), Some(10.0));
        assert_eq!(normalize(Some(-90.0)), Some(270.0));
        assert_eq!(discrete_direction(Some(-90.0)), Some(3));
        assert_eq!(normalize(Some(f32::NAN)), None);
    }

    #[test]
    fn test_invert() {
        assert_eq!(invert(Some(90.0)), Some(270.0));
        assert_eq!(invert(Some(270.0)), Some(90.0));
        assert_eq!(invert(None), None);
    }
}
