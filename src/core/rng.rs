use std::f64::consts::TAU;

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;
const XORSHIFT_STAR: u64 = 0x2545_F491_4F6C_DD1D;
const UNIT_53: f64 = 1.0 / (1_u64 << 53) as f64;

// ln(0) guard for the radial term
const MIN_UNIFORM: f64 = 1e-12;

pub fn derive_seed(master_seed: u64, stream: u64) -> u64 {
    mix(master_seed ^ mix(stream))
}

fn mix(value: u64) -> u64 {
    let mut z = value.wrapping_add(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[derive(Debug, Clone)]
pub struct Rng {
    state: u64,
    spare: Option<f64>,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        // xorshift never leaves zero
        let state = match mix(seed) {
            0 => GOLDEN_GAMMA,
            scrambled => scrambled,
        };
        Self { state, spare: None }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut s = self.state;
        s ^= s >> 12;
        s ^= s << 25;
        s ^= s >> 27;
        self.state = s;
        s.wrapping_mul(XORSHIFT_STAR)
    }

    /// Uniform on `[0, 1)` with 53 bits of precision.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * UNIT_53
    }

    pub fn standard_normal(&mut self) -> f64 {
        if let Some(z) = self.spare.take() {
            return z;
        }

        let radius = (-2.0 * self.next_f64().max(MIN_UNIFORM).ln()).sqrt();
        let (sin, cos) = (TAU * self.next_f64()).sin_cos();
        self.spare = Some(radius * sin);
        radius * cos
    }
}
