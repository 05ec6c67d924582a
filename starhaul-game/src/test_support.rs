//! Deterministic RNG doubles for unit tests.

use rand::RngCore;

/// Encode a unit-interval value so that `Rng::gen::<f64>()` returns it exactly
/// (up to 53 bits of precision).
fn encode_fraction(fraction: f64) -> u64 {
    let clamped = fraction.clamp(0.0, 0.999_999_999);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let mantissa = (clamped * (1_u64 << 53) as f64) as u64;
    mantissa << 11
}

/// Yields the same draw forever.
#[derive(Debug, Clone)]
pub struct FixedRng {
    value: u64,
    pub calls: u32,
}

impl FixedRng {
    pub fn fraction(fraction: f64) -> Self {
        Self {
            value: encode_fraction(fraction),
            calls: 0,
        }
    }
}

impl RngCore for FixedRng {
    fn next_u32(&mut self) -> u32 {
        self.calls = self.calls.saturating_add(1);
        (self.value >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.calls = self.calls.saturating_add(1);
        self.value
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let bytes = self.next_u64().to_le_bytes();
        for (idx, byte) in dest.iter_mut().enumerate() {
            *byte = bytes[idx % bytes.len()];
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Replays a scripted list of unit-interval draws, repeating the last one
/// once the script runs out.
#[derive(Debug, Clone)]
pub struct ScriptedRng {
    values: Vec<u64>,
    cursor: usize,
}

impl ScriptedRng {
    pub fn new(fractions: &[f64]) -> Self {
        Self {
            values: fractions.iter().copied().map(encode_fraction).collect(),
            cursor: 0,
        }
    }

    pub const fn consumed(&self) -> usize {
        self.cursor
    }
}

impl RngCore for ScriptedRng {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        let value = self
            .values
            .get(self.cursor)
            .or_else(|| self.values.last())
            .copied()
            .unwrap_or(0);
        self.cursor += 1;
        value
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let bytes = self.next_u64().to_le_bytes();
        for (idx, byte) in dest.iter_mut().enumerate() {
            *byte = bytes[idx % bytes.len()];
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
