// Regenerates shadow/highlight colors from a new base color while keeping the
// lightness and saturation proportions of the original artwork.
use hashbrown::HashMap;

use crate::{
    color::Hsl,
    common::{ColorIdx, Rgb},
    error::{Error, Result},
};

// Below this the primary's S or L is treated as zero and the ratio pinned to 1.
const RATIO_EPSILON: f64 = 0.001;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ShadeRelationship {
    pub saturation_ratio: f64,
    pub lightness_ratio: f64,
}

#[derive(Clone, Debug)]
pub struct ShadeModel {
    primary: ColorIdx,
    relationships: HashMap<ColorIdx, ShadeRelationship>,
}

fn ratio(value: f64, primary: f64) -> f64 {
    if primary > RATIO_EPSILON {
        value / primary
    } else {
        1.0
    }
}

impl ShadeModel {
    /// Captures each tracked index's ratios relative to `primary`.
    pub fn new(original: &HashMap<ColorIdx, Rgb>, primary: ColorIdx) -> Result<Self> {
        let primary_hsl = original
            .get(&primary)
            .map(|c| Hsl::from_rgb(*c))
            .ok_or_else(|| {
                Error::Argument(format!("primary index {primary} not among the original colors"))
            })?;

        let relationships = original
            .iter()
            .filter(|&(&idx, _)| idx != primary)
            .map(|(&idx, &color)| {
                let hsl = Hsl::from_rgb(color);
                let rel = ShadeRelationship {
                    saturation_ratio: ratio(hsl.s, primary_hsl.s),
                    lightness_ratio: ratio(hsl.l, primary_hsl.l),
                };
                (idx, rel)
            })
            .collect();

        Ok(ShadeModel {
            primary,
            relationships,
        })
    }

    pub fn primary(&self) -> ColorIdx {
        self.primary
    }

    pub fn relationship(&self, index: ColorIdx) -> Option<&ShadeRelationship> {
        self.relationships.get(&index)
    }

    pub fn generate_shade(&self, index: ColorIdx, new_primary: Rgb) -> Result<Rgb> {
        if index == self.primary {
            return Ok(new_primary);
        }
        let rel = self
            .relationships
            .get(&index)
            .ok_or_else(|| Error::NotFound(format!("index {index} has no captured shade")))?;

        let base = Hsl::from_rgb(new_primary);
        let shade = Hsl::new(
            base.h,
            (base.s * rel.saturation_ratio).clamp(0.0, 1.0),
            (base.l * rel.lightness_ratio).clamp(0.0, 1.0),
        );
        Ok(shade.to_rgb())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_ramp() -> HashMap<ColorIdx, Rgb> {
        let mut m = HashMap::new();
        m.insert(3, Rgb::new(77, 77, 77));
        m.insert(4, Rgb::new(128, 128, 128));
        m.insert(5, Rgb::new(190, 190, 190));
        m
    }

    #[test]
    fn primary_returns_new_color_exactly() {
        let model = ShadeModel::new(&gray_ramp(), 4).unwrap();
        for c in [Rgb::new(255, 0, 0), Rgb::new(1, 2, 3), Rgb::new(0, 0, 0)] {
            assert_eq!(model.generate_shade(4, c).unwrap(), c);
        }
    }

    #[test]
    fn red_shadow_from_gray_ramp() {
        let model = ShadeModel::new(&gray_ramp(), 4).unwrap();
        let shadow = model.generate_shade(3, Rgb::new(255, 0, 0)).unwrap();
        let hsl = Hsl::from_rgb(shadow);
        assert!(hsl.h.abs() < 1.0);
        assert!((hsl.l - 0.3).abs() < 0.02, "lightness {}", hsl.l);
        assert!((shadow.red as i32 - 153).abs() <= 3);
        assert_eq!((shadow.green, shadow.blue), (0, 0));
    }

    #[test]
    fn lightness_ratio_is_preserved() {
        let model = ShadeModel::new(&gray_ramp(), 4).unwrap();
        for c in [
            Rgb::new(255, 0, 0),
            Rgb::new(30, 90, 200),
            Rgb::new(10, 10, 10),
            Rgb::new(180, 220, 40),
        ] {
            for idx in [3, 5] {
                let r = model.relationship(idx).unwrap().lightness_ratio;
                let expected = (Hsl::from_rgb(c).l * r).clamp(0.0, 1.0);
                let got = Hsl::from_rgb(model.generate_shade(idx, c).unwrap()).l;
                assert!((got - expected).abs() < 0.02, "idx {idx} color {c}");
            }
        }
    }

    #[test]
    fn derived_hue_follows_new_base() {
        let mut original = HashMap::new();
        original.insert(1, Rgb::new(40, 80, 160));
        original.insert(2, Rgb::new(120, 60, 30));
        let model = ShadeModel::new(&original, 2).unwrap();
        let base = Rgb::new(20, 200, 60);
        let shade = model.generate_shade(1, base).unwrap();
        let diff = (Hsl::from_rgb(shade).h - Hsl::from_rgb(base).h).abs();
        assert!(diff < 2.0, "hue diff {diff}");
    }

    #[test]
    fn zero_primary_guards_ratios() {
        let mut original = HashMap::new();
        original.insert(1, Rgb::new(0, 0, 0));
        original.insert(2, Rgb::new(60, 60, 60));
        let model = ShadeModel::new(&original, 1).unwrap();
        let rel = model.relationship(2).unwrap();
        assert_eq!(rel.saturation_ratio, 1.0);
        assert_eq!(rel.lightness_ratio, 1.0);
    }

    #[test]
    fn output_is_clamped_for_bright_ratios() {
        let mut original = HashMap::new();
        original.insert(1, Rgb::new(40, 40, 40));
        original.insert(2, Rgb::new(250, 250, 250));
        let model = ShadeModel::new(&original, 1).unwrap();
        let shade = model.generate_shade(2, Rgb::new(255, 255, 255)).unwrap();
        assert_eq!(shade, Rgb::new(255, 255, 255));
    }

    #[test]
    fn missing_primary_is_an_argument_error() {
        let err = ShadeModel::new(&gray_ramp(), 9).unwrap_err();
        assert!(matches!(err, Error::Argument(_)));
    }

    #[test]
    fn untracked_index_is_not_found() {
        let model = ShadeModel::new(&gray_ramp(), 4).unwrap();
        let err = model.generate_shade(7, Rgb::new(1, 1, 1)).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
