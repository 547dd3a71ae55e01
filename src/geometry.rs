//! Work-group geometry.
//!
//! A launch is described by its global size (total work-items per dimension)
//! and local size (work-items per group). OpenCL requires every global
//! dimension to be a multiple of the matching local dimension.

use crate::error::{LaunchError, Result};

/// Global and local work sizes of one kernel launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkGeometry {
    Linear { global: usize, local: usize },
    Planar { global: [usize; 2], local: [usize; 2] },
}

/// Rounds `n` up to the next multiple of `multiple`.
pub fn round_up(n: usize, multiple: usize) -> usize {
    n.div_ceil(multiple) * multiple
}

impl WorkGeometry {
    /// Creates a 1-D geometry covering `len` items.
    ///
    /// The global size is rounded up to a whole number of groups, so the
    /// kernel has to ignore work-items at or past `len`.
    pub fn linear(len: usize, group_size: usize) -> Result<Self> {
        if len == 0 || group_size == 0 {
            return Err(LaunchError::InvalidGeometry(format!(
                "length {} and group size {} must be positive",
                len, group_size
            )));
        }
        Ok(WorkGeometry::Linear {
            global: round_up(len, group_size),
            local: group_size,
        })
    }

    /// Creates a 2-D geometry for an `edge` x `edge` matrix split into square tiles.
    pub fn square(edge: usize, tile: usize) -> Result<Self> {
        if edge == 0 || tile == 0 || edge % tile != 0 {
            return Err(LaunchError::InvalidGeometry(format!(
                "matrix edge {} must be a positive multiple of tile edge {}",
                edge, tile
            )));
        }
        Ok(WorkGeometry::Planar {
            global: [edge, edge],
            local: [tile, tile],
        })
    }

    pub fn dimensions(&self) -> usize {
        match self {
            WorkGeometry::Linear { .. } => 1,
            WorkGeometry::Planar { .. } => 2,
        }
    }

    /// Returns the total number of work-items launched.
    pub fn total_work_items(&self) -> usize {
        match self {
            WorkGeometry::Linear { global, .. } => *global,
            WorkGeometry::Planar { global, .. } => global[0] * global[1],
        }
    }

    /// Returns the global work size, padded to three dimensions with 1.
    pub fn global_work_size(&self) -> [usize; 3] {
        match *self {
            WorkGeometry::Linear { global, .. } => [global, 1, 1],
            WorkGeometry::Planar { global, .. } => [global[0], global[1], 1],
        }
    }

    /// Returns the local work size, padded to three dimensions with 1.
    pub fn local_work_size(&self) -> [usize; 3] {
        match *self {
            WorkGeometry::Linear { local, .. } => [local, 1, 1],
            WorkGeometry::Planar { local, .. } => [local[0], local[1], 1],
        }
    }
}

impl std::fmt::Display for WorkGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkGeometry::Linear { global, local } => write!(f, "global {} / local {}", global, local),
            WorkGeometry::Planar { global, local } => write!(
                f,
                "global {}x{} / local {}x{}",
                global[0], global[1], local[0], local[1]
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1024, 256, 1024)]
    #[case(1000, 256, 1024)]
    #[case(1, 256, 256)]
    #[case(257, 256, 512)]
    fn test_linear_rounds_up(#[case] len: usize, #[case] group: usize, #[case] expected: usize) {
        let geometry = WorkGeometry::linear(len, group).unwrap();
        assert_eq!(
            geometry,
            WorkGeometry::Linear {
                global: expected,
                local: group
            }
        );
        assert_eq!(geometry.total_work_items() % group, 0);
    }

    #[rstest]
    #[case(4)]
    #[case(16)]
    #[case(64)]
    fn test_square_matches_edge(#[case] edge: usize) {
        let geometry = WorkGeometry::square(edge, 4).unwrap();
        assert_eq!(
            geometry,
            WorkGeometry::Planar {
                global: [edge, edge],
                local: [4, 4]
            }
        );
        assert_eq!(geometry.dimensions(), 2);
        assert_eq!(geometry.total_work_items(), edge * edge);
    }

    #[rstest]
    #[case(0, 4)]
    #[case(6, 4)]
    #[case(8, 0)]
    fn test_square_rejects_partial_tiles(#[case] edge: usize, #[case] tile: usize) {
        assert!(matches!(
            WorkGeometry::square(edge, tile),
            Err(LaunchError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_linear_rejects_empty() {
        assert!(WorkGeometry::linear(0, 256).is_err());
    }

    #[test]
    fn test_padded_work_sizes() {
        let geometry = WorkGeometry::linear(1000, 256).unwrap();
        assert_eq!(geometry.global_work_size(), [1024, 1, 1]);
        assert_eq!(geometry.local_work_size(), [256, 1, 1]);

        let geometry = WorkGeometry::square(8, 4).unwrap();
        assert_eq!(geometry.global_work_size(), [8, 8, 1]);
        assert_eq!(geometry.local_work_size(), [4, 4, 1]);
    }

    #[test]
    fn test_display() {
        let geometry = WorkGeometry::square(16, 4).unwrap();
        assert_eq!(geometry.to_string(), "global 16x16 / local 4x4");
    }
}
