//! Deterministic random streams segregated by simulation domain.

use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use sha2::Sha256;
use std::cell::{RefCell, RefMut};

/// One independent stream per concern, so adding draws to one domain never
/// shifts the outcomes of another.
#[derive(Debug, Clone)]
pub struct RngBundle {
    expedition: RefCell<CountingRng<SmallRng>>,
    events: RefCell<CountingRng<SmallRng>>,
    rewards: RefCell<CountingRng<SmallRng>>,
    autopilot: RefCell<CountingRng<SmallRng>>,
    missions: RefCell<CountingRng<SmallRng>>,
    store: RefCell<CountingRng<SmallRng>>,
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self::with_epoch(seed, &[])
    }

    /// Bundle for a session restored from a save stamped at `save_time`.
    ///
    /// Streams are re-keyed with the stamp so a reloaded game does not replay
    /// the draws of the session that wrote it.
    #[must_use]
    pub fn resumed(seed: u64, save_time: u64) -> Self {
        Self::with_epoch(seed, &save_time.to_le_bytes())
    }

    fn with_epoch(seed: u64, epoch: &[u8]) -> Self {
        let stream = |tag: &[u8]| RefCell::new(CountingRng::new(derive_stream_seed(seed, tag, epoch)));
        Self {
            expedition: stream(b"expedition"),
            events: stream(b"events"),
            rewards: stream(b"rewards"),
            autopilot: stream(b"autopilot"),
            missions: stream(b"missions"),
            store: stream(b"store"),
        }
    }

    /// Milestone hazards, success and drop rolls of live expeditions.
    #[must_use]
    pub fn expedition(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.expedition.borrow_mut()
    }

    /// Event selection and skill checks.
    #[must_use]
    pub fn events(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.events.borrow_mut()
    }

    /// Capsule openings and deep-space hauls.
    #[must_use]
    pub fn rewards(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.rewards.borrow_mut()
    }

    #[must_use]
    pub fn autopilot(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.autopilot.borrow_mut()
    }

    #[must_use]
    pub fn missions(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.missions.borrow_mut()
    }

    /// Ship boxes.
    #[must_use]
    pub fn store(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.store.borrow_mut()
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8], epoch: &[u8]) -> u64 {
    // HMAC accepts keys of any length, so the fallback is unreachable in practice.
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    mac.update(epoch);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}
