//! Rigid lidar-to-camera transform.

use nalgebra::{IsometryMatrix3, Matrix3, Matrix4, Point3, Rotation3, Translation3, Vector3};

use super::CalibrationError;

/// Tolerance on the homogeneous row `[0, 0, 0, 1]`.
const HOMOGENEOUS_TOLERANCE: f64 = 1e-6;
/// Tolerance on `det(R) = 1` and `RᵀR = I`.
const ROTATION_TOLERANCE: f64 = 1e-3;

/// Lidar-to-camera transform, validated as a proper rigid motion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extrinsics {
    lidar_to_camera: IsometryMatrix3<f64>,
}

impl Default for Extrinsics {
    fn default() -> Self {
        Self::identity()
    }
}

impl Extrinsics {
    /// Identity transform (lidar and camera frames coincide).
    pub fn identity() -> Self {
        Self {
            lidar_to_camera: IsometryMatrix3::identity(),
        }
    }

    /// Wrap an existing isometry.
    pub fn from_isometry(lidar_to_camera: IsometryMatrix3<f64>) -> Self {
        Self { lidar_to_camera }
    }

    /// Load from a nested row-major 4x4 array.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, CalibrationError> {
        let shape_ok = rows.len() == 4 && rows.iter().all(|row| row.len() == 4);
        if !shape_ok {
            return Err(CalibrationError::ExtrinsicsShape {
                rows: rows.len(),
                cols: rows.iter().map(Vec::len).max().unwrap_or(0),
            });
        }
        let matrix = Matrix4::from_fn(|r, c| rows[r][c]);
        Self::from_matrix(&matrix)
    }

    /// Load from a homogeneous 4x4 matrix.
    pub fn from_matrix(matrix: &Matrix4<f64>) -> Result<Self, CalibrationError> {
        if !matrix.iter().all(|v| v.is_finite()) {
            return Err(CalibrationError::NonFiniteExtrinsics);
        }

        let last_row = [matrix[(3, 0)], matrix[(3, 1)], matrix[(3, 2)], matrix[(3, 3)]];
        let expected = [0.0, 0.0, 0.0, 1.0];
        if last_row
            .iter()
            .zip(expected)
            .any(|(v, e)| (v - e).abs() > HOMOGENEOUS_TOLERANCE)
        {
            return Err(CalibrationError::NotHomogeneous(last_row));
        }

        let rotation: Matrix3<f64> = matrix.fixed_view::<3, 3>(0, 0).into_owned();
        let det = rotation.determinant();
        if (det - 1.0).abs() > ROTATION_TOLERANCE {
            return Err(CalibrationError::NotARotation { determinant: det });
        }
        let orthogonality = (rotation.transpose() * rotation - Matrix3::identity()).amax();
        if orthogonality > ROTATION_TOLERANCE {
            return Err(CalibrationError::NotOrthogonal {
                error: orthogonality,
            });
        }

        let translation = Vector3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)]);
        Ok(Self {
            lidar_to_camera: IsometryMatrix3::from_parts(
                Translation3::from(translation),
                Rotation3::from_matrix_unchecked(rotation),
            ),
        })
    }

    /// Underlying isometry.
    #[inline]
    pub fn isometry(&self) -> &IsometryMatrix3<f64> {
        &self.lidar_to_camera
    }

    /// Homogeneous 4x4 matrix.
    pub fn to_matrix(&self) -> Matrix4<f64> {
        self.lidar_to_camera.to_homogeneous()
    }

    /// Lidar frame → camera frame.
    #[inline]
    pub fn transform(&self, point: &Point3<f64>) -> Point3<f64> {
        self.lidar_to_camera.transform_point(point)
    }

    /// Camera frame → lidar frame.
    #[inline]
    pub fn inverse_transform(&self, point: &Point3<f64>) -> Point3<f64> {
        self.lidar_to_camera.inverse_transform_point(point)
    }
}
