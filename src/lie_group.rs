//! SE(3) exponential and logarithm, tangent vectors stored as `[rho; omega]`.

use nalgebra as na;

const SMALL_ANGLE: f64 = 1e-6;

pub fn hat(omega: &na::Vector3<f64>) -> na::Matrix3<f64> {
    omega.cross_matrix()
}

/// Left Jacobian of SO(3), mapping the tangent translation to the pose one.
fn left_jacobian(omega: &na::Vector3<f64>) -> na::Matrix3<f64> {
    let theta = omega.norm();
    let w = hat(omega);
    let w2 = w * w;
    if theta < SMALL_ANGLE {
        return na::Matrix3::identity() + w * 0.5 + w2 / 6.0;
    }
    let theta2 = theta * theta;
    na::Matrix3::identity()
        + w * ((1.0 - theta.cos()) / theta2)
        + w2 * ((theta - theta.sin()) / (theta2 * theta))
}

fn left_jacobian_inverse(omega: &na::Vector3<f64>) -> na::Matrix3<f64> {
    let theta = omega.norm();
    let w = hat(omega);
    let w2 = w * w;
    if theta < SMALL_ANGLE {
        return na::Matrix3::identity() - w * 0.5 + w2 / 12.0;
    }
    let theta2 = theta * theta;
    let coeff = (1.0 - theta * theta.sin() / (2.0 * (1.0 - theta.cos()))) / theta2;
    na::Matrix3::identity() - w * 0.5 + w2 * coeff
}

pub fn exp(xi: &na::Vector6<f64>) -> na::Isometry3<f64> {
    let rho = xi.fixed_rows::<3>(0).into_owned();
    let omega = xi.fixed_rows::<3>(3).into_owned();
    na::Isometry3::from_parts(
        na::Translation3::from(left_jacobian(&omega) * rho),
        na::UnitQuaternion::from_scaled_axis(omega),
    )
}

pub fn log(pose: &na::Isometry3<f64>) -> na::Vector6<f64> {
    let omega = pose.rotation.scaled_axis();
    let rho = left_jacobian_inverse(&omega) * pose.translation.vector;
    let mut xi = na::Vector6::zeros();
    xi.fixed_rows_mut::<3>(0).copy_from(&rho);
    xi.fixed_rows_mut::<3>(3).copy_from(&omega);
    xi
}

/// `pose^s` on the geodesic through the identity: `exp(s * log(pose))`.
pub fn scale(pose: &na::Isometry3<f64>, s: f64) -> na::Isometry3<f64> {
    exp(&(log(pose) * s))
}
