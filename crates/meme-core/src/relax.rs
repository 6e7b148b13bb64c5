//! The relaxation driver.
//!
//! Each pass ticks every active owner: the owner's boss vertex memes that
//! are still warm advance their cold count, compute a smoothed position and
//! commit it if it moved far enough. An owner with nothing warm left drops
//! out until one of its memes is set hot again.

use crate::engine::MemeEngine;
use crate::error::Result;
use crate::meme::MemeId;
use crate::owner::OwnerId;
use crate::substrate::Substrate;

/// Counts from one relaxation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelaxStats {
    /// Owners that were active at the start of the pass.
    pub owners_ticked: usize,
    /// Vertex memes that computed an update.
    pub memes_relaxed: usize,
    /// Vertex memes whose update was committed.
    pub memes_moved: usize,
}

impl RelaxStats {
    fn absorb(&mut self, other: RelaxStats) {
        self.owners_ticked += other.owners_ticked;
        self.memes_relaxed += other.memes_relaxed;
        self.memes_moved += other.memes_moved;
    }
}

impl<M: Substrate> MemeEngine<M> {
    /// The owner's boss vertex memes that are still warm.
    pub fn active_vert_memes(&self, owner: OwnerId) -> Result<Vec<MemeId>> {
        let mut active = Vec::new();
        for m in self.owner(owner)?.vert_memes() {
            if self.is_boss(m)? && self.is_warm(m)? {
                active.push(m);
            }
        }
        Ok(active)
    }

    /// Computes updates for the owner's active memes.
    pub fn owner_compute_update(&mut self, owner: OwnerId) -> Result<()> {
        let active = self.active_vert_memes(owner)?;
        self.compute_updates(&active)
    }

    /// Commits pending updates for the owner's active memes.
    pub fn owner_apply_update(&mut self, owner: OwnerId) -> Result<bool> {
        let active = self.active_vert_memes(owner)?;
        let thresh = self.options.commit_threshold_fraction;
        self.apply_updates(&active, thresh)
    }

    /// Runs one relaxation step for the owner. Returns true if the owner
    /// should stay active.
    pub fn owner_tick(&mut self, owner: OwnerId) -> Result<bool> {
        let (_, keep) = self.tick_owner(owner)?;
        Ok(keep)
    }

    fn tick_owner(&mut self, owner: OwnerId) -> Result<(RelaxStats, bool)> {
        let active = self.active_vert_memes(owner)?;
        for &m in &active {
            self.tick(m)?;
        }
        self.compute_updates(&active)?;

        let thresh = self.options.commit_threshold_fraction;
        let mut moved = 0;
        for &m in &active {
            if self.apply_update(m, thresh)? {
                moved += 1;
            }
        }
        let keep = moved > 0 || self.is_any_warm(&active)?;
        log::trace!(
            "owner {owner}: {} active, {moved} moved, keep={keep}",
            active.len()
        );

        let stats = RelaxStats {
            owners_ticked: 1,
            memes_relaxed: active.len(),
            memes_moved: moved,
        };
        Ok((stats, keep))
    }

    /// Ticks every active owner once, then brings subdivision locations up
    /// to date.
    pub fn relax_pass(&mut self) -> Result<RelaxStats> {
        let active: Vec<OwnerId> = self
            .owners
            .values()
            .filter(|o| o.is_active())
            .map(|o| o.id())
            .collect();

        let mut stats = RelaxStats::default();
        for id in active {
            let (owner_stats, keep) = self.tick_owner(id)?;
            stats.absorb(owner_stats);
            if !keep {
                log::debug!("owner {id} went cold");
                self.owner_mut(id)?.set_active(false);
            }
        }
        self.update_subdiv_locs()?;
        Ok(stats)
    }

    /// Runs passes until no owner is active or `max_passes` is reached.
    /// Returns the number of passes run.
    pub fn relax_until_cold(&mut self, max_passes: usize) -> Result<usize> {
        for pass in 0..max_passes {
            if !self.owners.values().any(|o| o.is_active()) {
                return Ok(pass);
            }
            self.relax_pass()?;
        }
        Ok(max_passes)
    }

    // === List helpers ===

    pub fn compute_updates(&mut self, memes: &[MemeId]) -> Result<()> {
        for &m in memes {
            self.compute_update(m)?;
        }
        Ok(())
    }

    /// Applies pending updates. Returns true if any was committed.
    pub fn apply_updates(&mut self, memes: &[MemeId], thresh: f32) -> Result<bool> {
        let mut moved = false;
        for &m in memes {
            moved |= self.apply_update(m, thresh)?;
        }
        Ok(moved)
    }

    pub fn is_any_warm(&self, memes: &[MemeId]) -> Result<bool> {
        for &m in memes {
            if self.is_warm(m)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn set_hot_all(&mut self, memes: &[MemeId]) -> Result<()> {
        for &m in memes {
            self.set_hot(m)?;
        }
        Ok(())
    }

    pub fn sterilize_all(&mut self, memes: &[MemeId]) -> Result<()> {
        for &m in memes {
            self.sterilize(m)?;
        }
        Ok(())
    }

    pub fn unsterilize_all(&mut self, memes: &[MemeId]) -> Result<()> {
        for &m in memes {
            self.unsterilize(m)?;
        }
        Ok(())
    }

    pub fn pin_all(&mut self, memes: &[MemeId]) -> Result<()> {
        for &m in memes {
            self.pin(m)?;
        }
        Ok(())
    }

    pub fn unpin_all(&mut self, memes: &[MemeId]) -> Result<()> {
        for &m in memes {
            self.unpin(m)?;
        }
        Ok(())
    }
}
