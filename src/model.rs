//! Prediction by Partial Matching model.
//!
//! Blends frequency statistics from contexts of several lengths: coding
//! starts at the configured order and escapes down one order at a time until
//! the symbol has a slice, with order -1 as the universal fallback that
//! grants every still-unseen byte frequency 1. The escape frequency of a
//! context is the number of distinct symbols already seen in it (escape
//! method C), and symbols claimed at a higher order are excluded from lower
//! ones through a 256-bit exclusion mask.
//!
//! Update adds to symbol counts only in the contexts visited while coding,
//! not in their shorter prefixes ("update exclusion"). When the context
//! table saturates mid-update the model resets it and, if configured, warm
//! starts it by replaying the retained text window.

use std::collections::VecDeque;

use crate::config::{CodecOptions, CODER_RESCALE, DIST_LEN, EOS, ESCAPE, MAX_FREQ};
use crate::cuckoo::{child_key, CuckooTable, ROOT_KEY};
use crate::error::Result;

/// Whether byte `c` is marked in a 256-bit symbol set.
#[inline(always)]
pub(crate) fn check_bit(mask: &[u64; 4], c: usize) -> bool {
    mask[c >> 6] & bit_mask(c) != 0
}

#[inline(always)]
fn bit_mask(c: usize) -> u64 {
    1 << (0x3F - (c & 0x3F))
}

pub struct Model {
    /// Configured model order.
    order: u8,
    /// Context frequency store.
    table: CuckooTable,
    /// Recent plaintext, newest byte at the back.
    window: VecDeque<u8>,
    /// Retained history: order + 1 bytes, or the bootstrap buffer size.
    window_cap: usize,
    /// Context keys visited by the distribution calls for the current
    /// symbol, consumed by the next update.
    visits: Vec<u64>,
    /// Replay the window into a freshly reset table on saturation.
    bootstrap: bool,
    /// Fast local adaptation enabled.
    adapt: bool,
    /// Rescale once accumulated escape mass reaches this.
    adapt_threshold: u32,
    /// Accumulated escape mass since the last rescale.
    sum_esc: u32,
    /// Escape left endpoint of the highest-order distribution call.
    first_run: u32,
    /// Escape left endpoint of the most recent distribution call.
    last_run: u32,
    /// A rescale is due before the next counts are bumped.
    outscale: bool,
    /// Saturation resets performed so far.
    resets: u64,
}

impl Model {
    /// Allocate a model for the given parameters. The table memory is
    /// reserved here, once; nothing else allocates during coding.
    pub fn new(opts: &CodecOptions) -> Result<Self> {
        opts.validate()?;
        Self::with_table(opts, CuckooTable::new(opts.mem)?)
    }

    /// Model over a pre-built table; small tables make saturation cheap to
    /// exercise.
    #[cfg(test)]
    pub(crate) fn with_table_capacity(opts: &CodecOptions, entries: usize) -> Result<Self> {
        Self::with_table(opts, CuckooTable::with_capacity(entries)?)
    }

    fn with_table(opts: &CodecOptions, table: CuckooTable) -> Result<Self> {
        let window_cap = if opts.bootstrap() {
            opts.bootsize as usize * 1024
        } else {
            opts.order as usize + 1
        };
        Ok(Self {
            order: opts.order,
            table,
            window: VecDeque::with_capacity(window_cap),
            window_cap,
            visits: Vec::with_capacity(opts.order as usize + 1),
            bootstrap: opts.bootstrap(),
            adapt: opts.adapt(),
            adapt_threshold: ((1u64 << opts.adaptsize) - 1) as u32,
            sum_esc: 0,
            first_run: 0,
            last_run: 0,
            outscale: false,
            resets: 0,
        })
    }

    /// Configured order, as the top of the coding descent.
    pub fn order(&self) -> i32 {
        self.order as i32
    }

    /// Saturation resets performed so far.
    pub fn saturation_resets(&self) -> u64 {
        self.resets
    }

    /// Fill `dist` with the cumulative frequencies of the order-`ord`
    /// context over symbols 0..=EOS.
    ///
    /// For symbol `s`, `dist[s]` is the left endpoint of its slice and
    /// `dist[s + 1]` the right; `dist[EOS + 1]` is the total. `dist_check`
    /// is written with the set of byte symbols that received a non-zero
    /// slice this call — all other byte entries of `dist` are stale.
    /// `exclude` carries higher-order exclusion across the descent: the
    /// top-order call resets it to all-ones, and every symbol given a slice
    /// clears its bit for the lower orders.
    pub fn dist(
        &mut self,
        ord: i32,
        dist: &mut [u32; DIST_LEN],
        exclude: &mut [u64; 4],
        dist_check: &mut [u64; 4],
    ) {
        const ESC: usize = ESCAPE as usize;
        const END: usize = EOS as usize;

        if ord == self.order as i32 {
            dist.fill(0);
            exclude.fill(!0);
            self.first_run = 0;
        }
        dist_check.fill(0);

        // Universal fallback: frequency 1 for every byte not claimed by a
        // higher order, and the only place EOS has a slice.
        if ord < 0 {
            let mut run = 0u32;
            for c in 0..256usize {
                if exclude[c >> 6] & bit_mask(c) != 0 {
                    dist[c] = run;
                    run += 1;
                    dist[c + 1] = run;
                    dist_check[c >> 6] |= bit_mask(c);
                }
            }
            dist[ESC] = run;
            dist[END] = run;
            dist[END + 1] = run + 1;
            self.last_run = run;
            return;
        }

        let ord_len = ord as usize;
        if self.window.len() < ord_len {
            // No context this long yet: escape with certainty
            dist[ESC] = 0;
            dist[END] = 1;
            dist[END + 1] = 1;
            self.last_run = 0;
            return;
        }

        let key = self.context_key(ord_len);
        if !self.table.contains(key) {
            // Unknown context: escape, and have update() create it
            dist[ESC] = 0;
            dist[END] = 1;
            dist[END + 1] = 1;
            self.last_run = 0;
            self.visits.push(key);
            return;
        }

        let followers = self.table.follower_vec(key);
        let mut run = 0u32;
        let mut syms = 0u32;
        for w in 0..4 {
            let mut bits = followers[w] & exclude[w];
            while bits != 0 {
                let b = bits.leading_zeros();
                bits ^= 1 << (63 - b);
                let c = (w << 6) + b as usize;
                let freq = self.table.count(child_key(key, c as u8)) as u32;
                if freq == 0 {
                    // Floored away by a rescale; may still score lower down
                    continue;
                }
                dist[c] = run;
                run += 2 * freq - 1;
                dist[c + 1] = run;
                dist_check[c >> 6] |= bit_mask(c);
                exclude[c >> 6] &= !bit_mask(c);
                syms += 1;
            }
        }

        // Escape method C: escape frequency = distinct symbols seen here
        let esc = syms.max(1);
        dist[ESC] = run;
        dist[END] = run + esc;
        dist[END + 1] = run + esc;

        if run + esc > CODER_RESCALE {
            self.outscale = true;
        }
        if ord == self.order as i32 {
            self.first_run = run;
        }
        self.last_run = run;
        self.visits.push(key);
    }

    /// Record symbol `c` in every context visited since the last update,
    /// then advance the text window.
    pub fn update(&mut self, c: u8) {
        if self.adapt {
            // Escape mass picked up below the top order; a symbol coded at
            // the top order contributes nothing
            self.sum_esc = self
                .sum_esc
                .saturating_add(self.last_run.saturating_sub(self.first_run));
            if self.sum_esc >= self.adapt_threshold {
                self.outscale = true;
                self.sum_esc = 0;
            }
        }

        if !self.outscale {
            for &key in &self.visits {
                if self.table.count(child_key(key, c)) >= MAX_FREQ - 1 {
                    self.outscale = true;
                    break;
                }
            }
        }
        if self.outscale {
            self.table.rescale();
            self.sum_esc = 0;
            self.outscale = false;
        }

        // Update exclusion: bump only the contexts used in coding
        let mut saturated = false;
        for &key in &self.visits {
            if !self.table.seen(child_key(key, c)) {
                saturated = true;
                break;
            }
        }
        self.visits.clear();

        if saturated {
            self.table.reset();
            self.resets += 1;
            if self.bootstrap && self.window.len() >= self.window_cap {
                self.replay();
            }
        }

        if self.window.len() == self.window_cap {
            self.window.pop_front();
        }
        self.window.push_back(c);
    }

    /// Warm start a freshly reset table from the retained window: level by
    /// level so every context's parent exists before its children, oldest
    /// position first within a level.
    fn replay(&mut self) {
        // In-place: the replay must not allocate
        self.window.make_contiguous();
        let (window, rest) = self.window.as_slices();
        debug_assert!(rest.is_empty());
        for len in 0..=self.order as usize {
            for i in len..window.len() {
                let key = window[i - len..=i]
                    .iter()
                    .fold(ROOT_KEY, |k, &b| child_key(k, b));
                if !self.table.seen(key) {
                    // No room even for the replay: reset once more and stop
                    // bootstrapping for good
                    self.table.reset();
                    self.resets += 1;
                    self.bootstrap = false;
                    return;
                }
            }
        }
    }

    /// Key of the context formed by the last `len` window bytes.
    fn context_key(&self, len: usize) -> u64 {
        let skip = self.window.len() - len;
        self.window
            .iter()
            .skip(skip)
            .fold(ROOT_KEY, |k, &b| child_key(k, b))
    }
}
