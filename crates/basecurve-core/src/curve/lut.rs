//! Dense 65536-entry float lookup table.

/// Number of table entries.
pub const LUT_SIZE: usize = 0x10000;

/// Scale applied to an input before truncating it to a table index.
const INDEX_SCALE: f32 = LUT_SIZE as f32;

/// Pre-computed lookup table sampled at `i / 65535` for `i` in `0..65536`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToneCurveLut {
    table: Vec<f32>,
}

impl ToneCurveLut {
    /// Identity table (`table[i] = i / 65535`).
    pub fn identity() -> Self {
        Self {
            table: (0..LUT_SIZE).map(Self::abscissa).collect(),
        }
    }

    /// Wrap a table produced elsewhere. Returns `None` unless it has exactly
    /// [`LUT_SIZE`] entries.
    pub fn from_table(table: Vec<f32>) -> Option<Self> {
        (table.len() == LUT_SIZE).then_some(Self { table })
    }

    /// Input value represented by entry `i`.
    #[inline]
    pub fn abscissa(i: usize) -> f32 {
        i as f32 / (LUT_SIZE - 1) as f32
    }

    /// Table index used for input `v`: `clamp((int)(v * 65536), 0, 65535)`.
    ///
    /// Truncation (not rounding) matches the table layout the extrapolation
    /// samples are taken from. NaN maps to index 0.
    #[inline]
    pub fn index_of(v: f32) -> usize {
        ((v * INDEX_SCALE) as i32).clamp(0, LUT_SIZE as i32 - 1) as usize
    }

    /// Look up `v` (intended for `v < 1.0`; larger inputs clamp to the last entry).
    #[inline]
    pub fn lookup(&self, v: f32) -> f32 {
        self.table[Self::index_of(v)]
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.table
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.table
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.table
    }

    /// Check if this LUT is the identity within `tolerance`.
    pub fn is_identity(&self, tolerance: f32) -> bool {
        self.table
            .iter()
            .enumerate()
            .all(|(i, &v)| (v - Self::abscissa(i)).abs() <= tolerance)
    }
}

impl Default for ToneCurveLut {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_lut() {
        let lut = ToneCurveLut::identity();
        assert_eq!(lut.as_slice().len(), LUT_SIZE);
        assert_eq!(lut.as_slice()[0], 0.0);
        assert_eq!(lut.as_slice()[LUT_SIZE - 1], 1.0);
        assert!(lut.is_identity(0.0));
    }

    #[test]
    fn test_index_truncates() {
        assert_eq!(ToneCurveLut::index_of(0.0), 0);
        // Just below the next entry still truncates down
        assert_eq!(ToneCurveLut::index_of(1.9 / 65536.0), 1);
        assert_eq!(ToneCurveLut::index_of(0.5), 32768);
        assert_eq!(ToneCurveLut::index_of(0.99999), 65535);
    }

    #[test]
    fn test_index_clamps() {
        assert_eq!(ToneCurveLut::index_of(-0.5), 0);
        assert_eq!(ToneCurveLut::index_of(1.0), LUT_SIZE - 1);
        assert_eq!(ToneCurveLut::index_of(1e9), LUT_SIZE - 1);
        assert_eq!(ToneCurveLut::index_of(f32::NAN), 0);
    }

    #[test]
    fn test_from_table_length_checked() {
        assert!(ToneCurveLut::from_table(vec![0.0; 16]).is_none());
        assert!(ToneCurveLut::from_table(vec![0.0; LUT_SIZE]).is_some());
    }
}
