//! Register level math of the Si570 programmable oscillator and the fixed point
//! formats used by the SoftRock firmware to exchange frequencies.
//!
//! The Si570 output frequency is `f_out = f_xtal * RFREQ / (HS_DIV * N1)`, where the
//! DCO frequency `f_xtal * RFREQ` has to stay between 4850 and 5670 MHz.
use std::fmt::Display;

/// Factory default I2C address of the Si570.
pub const DEFAULT_I2C_ADDRESS: u8 = 0x55;
/// Nominal crystal frequency in MHz. Each part deviates slightly, see [calibrated_xtal].
pub const NOMINAL_XTAL_MHZ: f64 = 114.285;
/// Factory programmed startup frequency in MHz of the parts used on SoftRock boards.
pub const DEFAULT_STARTUP_MHZ: f64 = 56.32;

pub const DCO_MIN_MHZ: f64 = 4850.0;
pub const DCO_MAX_MHZ: f64 = 5670.0;

const HS_DIVIDERS: [u8; 6] = [11, 9, 7, 6, 5, 4];
const RFREQ_FRACTION_BITS: u32 = 28;

/// The six frequency registers (7 to 12) of the Si570.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct Registers(pub [u8; 6]);

impl Registers {
    pub fn hs_div(&self) -> u32 {
        ((self.0[0] as u32 & 0xE0) >> 5) + 4
    }

    pub fn n1(&self) -> u32 {
        ((self.0[0] as u32 & 0x1F) << 2) + ((self.0[1] as u32 & 0xC0) >> 6) + 1
    }

    /// The 38 bit fixed point reference frequency multiplier.
    pub fn rfreq(&self) -> f64 {
        let r = self.0.map(u32::from);
        let integer = ((r[1] & 0x3F) << 4) + ((r[2] & 0xF0) >> 4);
        let fraction = ((r[2] & 0x0F) << 24) + (r[3] << 16) + (r[4] << 8) + r[5];
        integer as f64 + fraction as f64 / (1u64 << RFREQ_FRACTION_BITS) as f64
    }

    /// Output frequency in MHz for the given crystal frequency
    pub fn frequency(&self, xtal_mhz: f64) -> f64 {
        let divider = self.hs_div() * self.n1();
        if divider == 0 {
            return 0.0;
        }
        xtal_mhz * self.rfreq() / divider as f64
    }

    /// Computes the registers for `freq_mhz`, choosing the dividers with the lowest
    /// DCO frequency. Returns `None` when no divider combination reaches the frequency.
    pub fn for_frequency(freq_mhz: f64, xtal_mhz: f64) -> Option<Registers> {
        if !(freq_mhz > 0.0 && xtal_mhz > 0.0) {
            return None;
        }
        let mut best: Option<(f64, u8, u8)> = None;
        for hs_div in HS_DIVIDERS {
            // N1 may be 1 or any even number up to 128
            for n1 in std::iter::once(1u8).chain((2..=128).step_by(2)) {
                let dco = freq_mhz * hs_div as f64 * n1 as f64;
                if !(DCO_MIN_MHZ..=DCO_MAX_MHZ).contains(&dco) {
                    continue;
                }
                if best.is_none_or(|(best_dco, _, _)| dco < best_dco) {
                    best = Some((dco, hs_div, n1));
                }
            }
        }
        let (dco, hs_div, n1) = best?;

        let rfreq = dco / xtal_mhz;
        let integer = rfreq.trunc() as u32;
        let fraction = (((rfreq - rfreq.trunc()) * (1u64 << RFREQ_FRACTION_BITS) as f64).round()
            as u32)
            .min((1 << RFREQ_FRACTION_BITS) - 1);
        let hs = (hs_div - 4) as u32;
        let n = (n1 - 1) as u32;

        Some(Registers([
            ((hs << 5) | (n >> 2)) as u8,
            (((n & 0x03) << 6) | (integer >> 4)) as u8,
            (((integer & 0x0F) << 4) | (fraction >> 24)) as u8,
            (fraction >> 16) as u8,
            (fraction >> 8) as u8,
            fraction as u8,
        ]))
    }
}

impl Display for Registers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, register) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02X}", register)?;
        }
        Ok(())
    }
}

/// Derives the real crystal frequency from registers read right after power up,
/// when the part runs at its factory startup frequency.
pub fn calibrated_xtal(registers: &Registers, startup_mhz: f64) -> Option<f64> {
    let rfreq = registers.rfreq();
    if rfreq == 0.0 {
        return None;
    }
    Some(startup_mhz * (registers.hs_div() * registers.n1()) as f64 / rfreq)
}

/// Exclusive upper bound of the unsigned 11.21 format.
pub const FIXED_11_21_LIMIT_MHZ: f64 = 2048.0;
/// Exclusive upper bound of the unsigned 8.24 format.
pub const FIXED_8_24_LIMIT_MHZ: f64 = 256.0;

/// Scales `mhz` to a fixed point word with `fraction_bits`, or `None` when it is not
/// strictly between zero and `limit`.
fn to_unsigned_fixed(mhz: f64, fraction_bits: u32, limit: f64) -> Option<u64> {
    if !(mhz > 0.0 && mhz < limit) {
        return None;
    }
    Some((mhz * (1u64 << fraction_bits) as f64).round() as u64)
}

/// MHz as unsigned 11.21 fixed point, the format of frequencies on the USB wire.
///
/// Zero reads back as a failed read on the firmware, so it is rejected along with
/// negative and too large values.
pub fn to_fixed_11_21(mhz: f64) -> Option<u32> {
    to_unsigned_fixed(mhz, 21, FIXED_11_21_LIMIT_MHZ).and_then(|v| u32::try_from(v).ok())
}

pub fn from_fixed_11_21(value: u32) -> f64 {
    value as f64 / (1u32 << 21) as f64
}

/// Signed variant of 11.21 for the LO subtract value, which may be negative.
pub fn to_fixed_i11_21(mhz: f64) -> i32 {
    (mhz * (1u32 << 21) as f64).round() as i32
}

pub fn from_fixed_i11_21(value: i32) -> f64 {
    value as f64 / (1u32 << 21) as f64
}

/// MHz as unsigned 8.24 fixed point, the format of the stored crystal frequency.
pub fn to_fixed_8_24(mhz: f64) -> Option<u32> {
    to_unsigned_fixed(mhz, 24, FIXED_8_24_LIMIT_MHZ).and_then(|v| u32::try_from(v).ok())
}

pub fn from_fixed_8_24(value: u32) -> f64 {
    value as f64 / (1u32 << 24) as f64
}

/// MHz as unsigned 11.5 fixed point, the format of filter crossover points.
pub fn to_fixed_11_5(mhz: f64) -> Option<u16> {
    to_unsigned_fixed(mhz, 5, FIXED_11_21_LIMIT_MHZ).and_then(|v| u16::try_from(v).ok())
}

pub fn from_fixed_11_5(value: u16) -> f64 {
    value as f64 / (1u32 << 5) as f64
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decode_factory_registers() {
        // HS_DIV = 4, N1 = 22, RFREQ = 0x2BC011EB8 / 2^28
        let regs = Registers([0x05, 0x42, 0xBC, 0x01, 0x1E, 0xB8]);
        assert_eq!(regs.hs_div(), 4);
        assert_eq!(regs.n1(), 22);
        let rfreq = regs.rfreq();
        assert!((rfreq - 43.75027).abs() < 1e-4, "rfreq = {}", rfreq);
        let f = regs.frequency(NOMINAL_XTAL_MHZ);
        assert!((f - 56.82).abs() < 0.01, "f = {}", f);
    }

    #[test]
    fn encode_then_decode_frequency() {
        for freq in [3.5, 7.074 * 4.0, 14.074 * 4.0, 56.32, 100.0, 160.0] {
            let regs = Registers::for_frequency(freq, NOMINAL_XTAL_MHZ).unwrap();
            let dco = freq * (regs.hs_div() * regs.n1()) as f64;
            assert!((DCO_MIN_MHZ..=DCO_MAX_MHZ).contains(&dco));
            let decoded = regs.frequency(NOMINAL_XTAL_MHZ);
            assert!((decoded - freq).abs() < 1e-6, "{} != {}", decoded, freq);
        }
    }

    #[test]
    fn unreachable_frequencies() {
        assert_eq!(Registers::for_frequency(1.0, NOMINAL_XTAL_MHZ), None);
        assert_eq!(Registers::for_frequency(2000.0, NOMINAL_XTAL_MHZ), None);
        assert_eq!(Registers::for_frequency(0.0, NOMINAL_XTAL_MHZ), None);
    }

    #[test]
    fn calibration_recovers_crystal() {
        let xtal = 114.2901;
        let regs = Registers::for_frequency(DEFAULT_STARTUP_MHZ, xtal).unwrap();
        let calibrated = calibrated_xtal(&regs, DEFAULT_STARTUP_MHZ).unwrap();
        assert!((calibrated - xtal).abs() < 1e-6);
        assert_eq!(calibrated_xtal(&Registers::default(), DEFAULT_STARTUP_MHZ), None);
    }

    #[test]
    fn fixed_point_formats() {
        assert_eq!(to_fixed_11_21(1.0), Some(1 << 21));
        let word = to_fixed_11_21(56.296).unwrap();
        assert!((from_fixed_11_21(word) - 56.296).abs() < 1.0 / (1 << 21) as f64);
        assert_eq!(to_fixed_i11_21(-0.5), -(1 << 20));
        assert_eq!(from_fixed_i11_21(-(1 << 20)), -0.5);
        let word = to_fixed_8_24(NOMINAL_XTAL_MHZ).unwrap();
        assert!((from_fixed_8_24(word) - NOMINAL_XTAL_MHZ).abs() < 1e-7);
        assert_eq!(to_fixed_11_5(7.5), Some(240));
        assert_eq!(from_fixed_11_5(240), 7.5);
    }

    #[test]
    fn out_of_range_values_have_no_fixed_point_word() {
        // -7 MHz at the default multiplier of 4, and 1000 MHz likewise
        assert_eq!(to_fixed_11_21(-28.0), None);
        assert_eq!(to_fixed_11_21(4000.0), None);
        assert_eq!(to_fixed_11_21(0.0), None);
        assert_eq!(to_fixed_11_21(FIXED_11_21_LIMIT_MHZ), None);
        assert_eq!(to_fixed_11_21(f64::NAN), None);
        assert!(to_fixed_11_21(2047.99).is_some());

        assert_eq!(to_fixed_8_24(300.0), None);
        assert_eq!(to_fixed_8_24(-114.285), None);
        assert_eq!(to_fixed_11_5(-1.0), None);
        assert_eq!(to_fixed_11_5(4096.0), None);
    }

    #[test]
    fn display_registers() {
        let regs = Registers([0x05, 0x42, 0xBC, 0x01, 0x1E, 0xB8]);
        assert_eq!(regs.to_string(), "05 42 BC 01 1E B8");
    }
}
