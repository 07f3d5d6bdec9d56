use glam::{Vec3, Vec4, Vec4Swizzles};

use crate::TriangleId;

#[derive(Clone, Copy)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq))]
pub struct TriangleHit {
    pub distance: f32,
    pub point: Vec3,
    pub normal: Vec3,
    pub triangle_id: TriangleId,
}

impl TriangleHit {
    pub fn none() -> Self {
        Self {
            distance: f32::MAX,
            point: Default::default(),
            normal: Default::default(),
            triangle_id: TriangleId::new(0),
        }
    }

    pub fn unpack([d0, d1]: [Vec4; 2]) -> Self {
        Self {
            distance: d0.w,
            point: d0.xyz(),
            normal: d1.xyz(),
            triangle_id: TriangleId::new(d1.w.to_bits()),
        }
    }

    pub fn pack(self) -> [Vec4; 2] {
        let d0 = self.point.extend(self.distance);
        let d1 = self.normal.extend(f32::from_bits(self.triangle_id.get()));

        [d0, d1]
    }

    pub fn is_some(self) -> bool {
        self.distance < f32::MAX
    }

    pub fn is_none(self) -> bool {
        !self.is_some()
    }
}

impl Default for TriangleHit {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use glam::vec3;

    use super::*;

    #[test]
    fn serialization() {
        let target = TriangleHit {
            distance: 12.5,
            point: vec3(1.0, 2.0, 3.0),
            normal: vec3(0.0, 1.0, 0.0),
            triangle_id: TriangleId::new(1234),
        };

        assert_eq!(target, TriangleHit::unpack(target.pack()));
        assert!(TriangleHit::unpack(TriangleHit::none().pack()).is_none());
    }
}
