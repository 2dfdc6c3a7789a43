/*
Excitation Nonlinearities
=========================

Every self-oscillating model has one memoryless nonlinearity where the player
meets the instrument. Given a pressure or velocity difference it answers
"how much of the wave passes through the exciter":

  bow    stick-slip friction: near-zero velocity difference means the bow
         grips the string (output 1), large differences mean it slides
         (output falls off with the fourth power)

             1.0 ┤   ╭╮
                 │  ╱  ╲
                 │_╱    ╲_
             0.0 ┼──────────→ Δv

  reed   the reed opening shrinks linearly with pressure difference, and
         saturates fully open or shut

  jet    the air jet flips from one side of the flute's labium to the other:
         a cubic x³ - x, saturated

All three clamp to their range for every finite input, including ones whose
intermediate products overflow to infinity.
*/

/// Bow friction curve, output in `[0, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct BowTable {
    pub offset: f32,
    pub slope: f32,
}

impl Default for BowTable {
    fn default() -> Self {
        Self {
            offset: 0.0,
            slope: 3.0,
        }
    }
}

impl BowTable {
    #[inline]
    pub fn lookup(&self, sample: f32) -> f32 {
        let shaped = ((sample + self.offset) * self.slope).abs() + 0.75;
        shaped.powi(-4).min(1.0)
    }
}

/// Reed reflection coefficient, output in `[-1, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct ReedTable {
    pub offset: f32,
    pub slope: f32,
}

impl Default for ReedTable {
    fn default() -> Self {
        Self {
            offset: 0.7,
            slope: -0.3,
        }
    }
}

impl ReedTable {
    #[inline]
    pub fn lookup(&self, sample: f32) -> f32 {
        (self.offset + self.slope * sample).clamp(-1.0, 1.0)
    }
}

/// Jet deflection, output in `[-1, 1]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JetTable;

impl JetTable {
    #[inline]
    pub fn lookup(&self, sample: f32) -> f32 {
        (sample * (sample * sample - 1.0)).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sweep() -> impl Iterator<Item = f32> {
        let dense = (-4000..=4000).map(|i| i as f32 * 0.001);
        let wide = [
            -f32::MAX,
            -1.0e30,
            -1.0e10,
            -12_345.0,
            12_345.0,
            1.0e10,
            1.0e30,
            f32::MAX,
        ];
        dense.chain(wide)
    }

    #[test]
    fn bow_table_stays_in_unit_range() {
        for slope in [0.0, 1.0, 3.0, 5.0, 100.0] {
            let table = BowTable { offset: 0.0, slope };
            for x in sweep() {
                let y = table.lookup(x);
                assert!((0.0..=1.0).contains(&y), "bow({x}) = {y} with slope {slope}");
            }
        }
    }

    #[test]
    fn bow_grips_at_rest_and_slips_when_fast() {
        let table = BowTable::default();
        assert_eq!(table.lookup(0.0), 1.0);
        assert!(table.lookup(1.0) < 0.03);
        assert!(table.lookup(-1.0) < 0.03);
    }

    #[test]
    fn reed_table_saturates() {
        let table = ReedTable::default();
        for x in sweep() {
            let y = table.lookup(x);
            assert!((-1.0..=1.0).contains(&y), "reed({x}) = {y}");
        }
        assert!((table.lookup(0.0) - 0.7).abs() < 1e-6);
        assert_eq!(table.lookup(-10.0), 1.0);
        assert_eq!(table.lookup(10.0), -1.0);
    }

    #[test]
    fn jet_table_saturates() {
        let table = JetTable;
        for x in sweep() {
            let y = table.lookup(x);
            assert!((-1.0..=1.0).contains(&y), "jet({x}) = {y}");
        }
        assert_eq!(table.lookup(0.0), 0.0);
        assert_eq!(table.lookup(1.0), 0.0);
        assert_eq!(table.lookup(3.0), 1.0);
        assert_eq!(table.lookup(-3.0), -1.0);
    }
}
