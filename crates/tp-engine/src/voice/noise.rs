use alloc::sync::Arc;
use alloc::vec::Vec;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Pre-rendered white noise shared by the noise-based voices.
///
/// Rendering happens once at construction so triggers never allocate
/// sample memory on the scheduling path.
#[derive(Clone, Debug)]
pub struct NoiseBank {
    snare: Arc<[f32]>,
    hat: Arc<[f32]>,
    texture: Arc<[f32]>,
}

impl NoiseBank {
    pub const SNARE_SECONDS: f32 = 0.2;
    pub const HAT_SECONDS: f32 = 0.06;
    pub const TEXTURE_SECONDS: f32 = 1.2;

    pub fn new(sample_rate: f32, seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        Self {
            snare: render(&mut rng, sample_rate, Self::SNARE_SECONDS),
            hat: render(&mut rng, sample_rate, Self::HAT_SECONDS),
            texture: render(&mut rng, sample_rate, Self::TEXTURE_SECONDS),
        }
    }

    pub fn snare(&self) -> Arc<[f32]> {
        Arc::clone(&self.snare)
    }

    pub fn hat(&self) -> Arc<[f32]> {
        Arc::clone(&self.hat)
    }

    pub fn texture(&self) -> Arc<[f32]> {
        Arc::clone(&self.texture)
    }
}

fn render(rng: &mut Pcg32, sample_rate: f32, seconds: f32) -> Arc<[f32]> {
    let len = (sample_rate * seconds).max(1.0) as usize;
    let buf: Vec<f32> = (0..len).map(|_| rng.random_range(-1.0f32..1.0)).collect();
    buf.into()
}
