//! Directional path expansion shared by the ramp controller and the sweep mesh.

/// Intermediate points from `from` toward `to`, spaced by `|step|`, excluding `to`.
///
/// The first point is `from` itself; a zero step is treated as 1 so the path
/// always terminates. Equal endpoints yield an empty path.
pub fn transit_points(from: i32, to: i32, step: i32) -> Vec<i32> {
    let step = i64::from(step).abs().max(1);
    let (from, to) = (i64::from(from), i64::from(to));
    let dir = if to >= from { 1 } else { -1 };
    let span = (to - from).abs();
    let count = (span + step - 1) / step;
    (0..count).map(|k| (from + dir * k * step) as i32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upward_path_excludes_target() {
        let p = transit_points(0, 5000, 100);
        assert_eq!(p.len(), 50);
        assert_eq!(p.first(), Some(&0));
        assert_eq!(p.last(), Some(&4900));
    }

    #[test]
    fn downward_path_and_uneven_step() {
        assert_eq!(transit_points(1000, 0, 300), vec![1000, 700, 400, 100]);
        assert_eq!(transit_points(0, -250, 100), vec![0, -100, -200]);
    }

    #[test]
    fn equal_endpoints_are_empty() {
        assert!(transit_points(42, 42, 100).is_empty());
    }

    #[test]
    fn step_sign_is_ignored() {
        assert_eq!(transit_points(0, 300, -100), vec![0, 100, 200]);
    }
}
