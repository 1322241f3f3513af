//! Multiple-choice knapsack solver.
//!
//! Selects exactly one option per decision so that net value is maximized
//! while net burden stays acceptable under a capacity. Fully polynomial
//! approximation scheme: option values are quantized to integer scores
//! bounded by `precision`, and a per-score lightest-burden frontier is
//! carried across decisions. The solution's net value is within
//! `(1 − 1/precision)` of optimal whenever an acceptable solution exists;
//! runtime grows linearly with precision.
//!
//! Typical use keeps burdens proportional to CPU or GPU time, with the
//! capacity chosen to hold a frame rate or meet an audio deadline. The
//! solver is reusable: all scratch buffers persist across calls.

use smallvec::SmallVec;

use crate::consts::MIN_PRECISION;
use crate::economy::Economy;

/// A selectable option: a burden paid for a value gained.
#[derive(Debug, Clone, Copy)]
pub struct Item<B> {
    /// Cost charged against the capacity.
    pub burden: B,
    /// Benefit the solver maximizes. May be negative.
    pub value: f64,
    /// Quantized value, recomputed by every solve.
    score: i64,
}

impl<B> Item<B> {
    pub fn new(burden: B, value: f64) -> Self {
        Self {
            burden,
            value,
            score: 0,
        }
    }

    /// Integer score assigned by the most recent solve.
    pub fn score(&self) -> i64 {
        self.score
    }
}

/// Inline capacity for option lists; decisions rarely carry more options.
const ITEMS_INLINE: usize = 8;

/// One choice among mutually exclusive items.
///
/// The solver overwrites `choice`; the easy (min-burden) and high
/// (max-value possible) indices are derived during preparation.
#[derive(Debug, Clone)]
pub struct Decision<E: Economy> {
    items: SmallVec<[Item<E::Burden>; ITEMS_INLINE]>,
    choice: usize,
    choice_easy: usize,
    choice_high: usize,
}

impl<E: Economy> Default for Decision<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Economy> Decision<E> {
    pub fn new() -> Self {
        Self {
            items: SmallVec::new(),
            choice: 0,
            choice_easy: 0,
            choice_high: 0,
        }
    }

    pub fn from_items(items: impl IntoIterator<Item = Item<E::Burden>>) -> Self {
        let mut decision = Self::new();
        decision.items.extend(items);
        decision
    }

    /// Append an option.
    pub fn push(&mut self, burden: E::Burden, value: f64) {
        self.items.push(Item::new(burden, value));
    }

    /// Drop all options, keeping the current choice index for callers that
    /// rebuild the list every tick.
    pub fn clear_items(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[Item<E::Burden>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The option selected by the last solve.
    pub fn choice(&self) -> usize {
        self.choice
    }

    /// Index of the minimum-burden option.
    pub fn choice_easy(&self) -> usize {
        self.choice_easy
    }

    /// Index of the maximum-value possible option.
    pub fn choice_high(&self) -> usize {
        self.choice_high
    }

    pub fn chosen(&self) -> &Item<E::Burden> {
        &self.items[self.choice]
    }

    pub fn item_easy(&self) -> &Item<E::Burden> {
        &self.items[self.choice_easy]
    }

    pub fn item_high(&self) -> &Item<E::Burden> {
        &self.items[self.choice_high]
    }
}

/// Net totals over a set of chosen items.
#[derive(Debug, Clone, Copy)]
pub struct NetStats<B> {
    pub net_burden: B,
    pub net_value: f64,
    pub net_score: i64,
}

impl<B: Copy + std::ops::AddAssign> NetStats<B> {
    fn add(&mut self, item: &Item<B>) {
        self.net_burden += item.burden;
        self.net_value += item.value;
        self.net_score += item.score;
    }
}

/// Aggregate outcome of one solve.
#[derive(Debug, Clone, Copy)]
pub struct SolveStats<B> {
    /// Totals of the selected solution.
    pub chosen: NetStats<B>,
    /// Totals of the max-value-per-decision solution.
    pub highest: NetStats<B>,
    /// Totals of the min-burden-per-decision solution.
    pub lightest: NetStats<B>,
    /// Inner-loop iterations of the last solve.
    pub iterations: u64,
    /// Multiplier from value to integer score in the last solve.
    pub value_to_score_scale: f64,
}

/// Frontier entry: the lightest way to reach a given net score.
#[derive(Debug, Clone, Copy)]
struct Minimum<B> {
    net_score: i64,
    net_burden: B,
    choice: Option<usize>,
}

impl<B> Minimum<B> {
    fn valid(&self) -> bool {
        self.choice.is_some()
    }
}

fn invalid_minimum<E: Economy>() -> Minimum<E::Burden> {
    Minimum {
        net_score: 0,
        net_burden: E::infinite(),
        choice: None,
    }
}

/// Sparse table of validated frontier rows, one row per decision prefix.
///
/// Rows are stored back to back in `store`; `row_end[i]` is the exclusive
/// end of row `i`. Each row is ascending in net score, so lookups binary
/// search and the final decision scans from the high end.
#[derive(Debug)]
struct MinimumTable<E: Economy> {
    store: Vec<Minimum<E::Burden>>,
    row_end: Vec<usize>,
}

impl<E: Economy> MinimumTable<E> {
    fn new() -> Self {
        Self {
            store: Vec::new(),
            row_end: Vec::new(),
        }
    }

    fn clear(&mut self) {
        self.store.clear();
        self.row_end.clear();
    }

    fn row(&self, row: usize) -> &[Minimum<E::Burden>] {
        let start = if row == 0 { 0 } else { self.row_end[row - 1] };
        &self.store[start..self.row_end[row]]
    }

    /// The entry with exactly `score` in `row`; invalid if absent.
    fn lookup(&self, row: usize, score: i64) -> Minimum<E::Burden> {
        let entries = self.row(row);
        match entries.binary_search_by_key(&score, |m| m.net_score) {
            Ok(index) => entries[index],
            Err(_) => invalid_minimum::<E>(),
        }
    }

    /// Highest-score entry of the final row acceptable under `capacity`.
    fn decide(&self, capacity: &E::Capacity) -> Minimum<E::Burden> {
        let last = self.row_end.len() - 1;
        self.row(last)
            .iter()
            .rev()
            .find(|m| E::acceptable(&m.net_burden, capacity))
            .copied()
            .unwrap_or_else(invalid_minimum::<E>)
    }
}

/// The multiple-choice knapsack solver.
#[derive(Debug)]
pub struct Solver<E: Economy> {
    minimums: MinimumTable<E>,
    previous: Vec<Minimum<E::Burden>>,
    current: Vec<Minimum<E::Burden>>,
    order: Vec<usize>,
    stats: SolveStats<E::Burden>,
}

impl<E: Economy> Default for Solver<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Economy> Solver<E> {
    pub fn new() -> Self {
        Self {
            minimums: MinimumTable::new(),
            previous: Vec::new(),
            current: Vec::new(),
            order: Vec::new(),
            stats: SolveStats {
                chosen: zero_stats::<E>(),
                highest: zero_stats::<E>(),
                lightest: zero_stats::<E>(),
                iterations: 0,
                value_to_score_scale: 0.0,
            },
        }
    }

    /// Statistics from the most recent solve.
    pub fn stats(&self) -> &SolveStats<E::Burden> {
        &self.stats
    }

    /// Entries in the frontier table after the most recent solve.
    pub fn table_len(&self) -> usize {
        self.minimums.store.len()
    }

    /// Evaluate all decisions, writing one chosen option index into each.
    ///
    /// `capacity` limits the net burden of the selected options. If every
    /// combination exceeds it, the lowest-burden combination is selected
    /// and `false` is returned.
    ///
    /// `precision` governs optimality and cost: net value lands within
    /// `(1 − 1/precision)` of optimal, and runtime grows linearly with it.
    /// Values below 4 are clamped up.
    ///
    /// The order of `decisions` is never changed.
    pub fn solve(
        &mut self,
        decisions: &mut [Decision<E>],
        capacity: &E::Capacity,
        precision: usize,
    ) -> bool {
        let precision = precision.max(MIN_PRECISION);
        self.stats.iterations = 0;

        if decisions.is_empty() {
            self.stats.chosen = zero_stats::<E>();
            self.stats.highest = zero_stats::<E>();
            self.stats.lightest = zero_stats::<E>();
            return E::acceptable(&E::zero(), capacity);
        }

        self.prepare(decisions, precision);

        // Shortcut: even the lightest combination is overburdened.
        if !E::acceptable(&self.stats.lightest.net_burden, capacity) {
            for decision in decisions.iter_mut() {
                decision.choice = decision.choice_easy;
            }
            self.stats.chosen = self.stats.lightest;
            return false;
        }

        // Shortcut: the highest-value combination already fits.
        if E::acceptable(&self.stats.highest.net_burden, capacity) {
            for decision in decisions.iter_mut() {
                decision.choice = decision.choice_high;
            }
            self.stats.chosen = self.stats.highest;
            return true;
        }

        // Process decisions in ascending order of their best score; the
        // caller's slice order stays put.
        self.order.clear();
        self.order.extend(0..decisions.len());
        self.order.sort_by_key(|&i| decisions[i].item_high().score);

        self.compute_minimums(decisions, capacity);

        // Pick the highest-scoring acceptable endpoint, then walk the rows
        // backwards: each row's entry names the choice for its decision and
        // the score that must remain before it.
        let mut strategy = self.minimums.decide(capacity);
        let mut row = decisions.len();
        while row > 0 {
            row -= 1;
            let decision = &mut decisions[self.order[row]];
            let choice = match strategy.choice {
                Some(choice) => choice,
                None => {
                    debug_assert!(false, "frontier row missing a reachable score");
                    decision.choice_easy
                }
            };
            decision.choice = choice;
            let next_score = strategy.net_score - decision.items[choice].score;
            if row == 0 {
                debug_assert_eq!(next_score, 0, "reconstruction must end at score zero");
                break;
            }
            strategy = self.minimums.lookup(row - 1, next_score);
        }

        let mut chosen = zero_stats::<E>();
        for decision in decisions.iter() {
            chosen.add(decision.chosen());
        }
        self.stats.chosen = chosen;
        true
    }

    /// Two preparation passes over the decisions.
    ///
    /// The first finds each decision's minimum-burden option and the widest
    /// value range across decisions; the second quantizes every option's
    /// value into a score relative to its decision's easy option and finds
    /// the max-value possible option.
    fn prepare(&mut self, decisions: &mut [Decision<E>], precision: usize) {
        let mut max_value_range: f64 = 0.0;
        let mut lightest = zero_stats::<E>();

        for decision in decisions.iter_mut() {
            assert!(!decision.items.is_empty(), "decision with no options");

            let mut easy = 0;
            let mut max_value = decision.items[0].value;
            for (index, item) in decision.items.iter().enumerate().skip(1) {
                if item.value > max_value {
                    max_value = item.value;
                }
                if E::lesser(&item.burden, &decision.items[easy].burden) {
                    easy = index;
                }
            }
            decision.choice_easy = easy;

            let easy_item = decision.items[easy];
            lightest.net_burden += easy_item.burden;
            lightest.net_value += easy_item.value;
            max_value_range = max_value_range.max(max_value - easy_item.value);
        }

        // Degenerate range (all options tie): any acceptable solution is
        // equivalent, so quantize everything to score zero.
        if max_value_range <= 0.0 {
            max_value_range = 1.0;
        }
        let scale = precision as f64 / max_value_range;
        self.stats.value_to_score_scale = scale;

        let mut highest = zero_stats::<E>();
        for decision in decisions.iter_mut() {
            let value_easy = decision.items[decision.choice_easy].value;

            let mut high: Option<usize> = None;
            let mut high_score = i64::MIN;
            for index in 0..decision.items.len() {
                let score = ((decision.items[index].value - value_easy) * scale).ceil() as i64;
                decision.items[index].score = score;

                let item = &decision.items[index];
                if !E::is_possible(&item.burden) {
                    continue;
                }
                // Score ties break toward the lighter burden, so an all-tied
                // decision resolves to its easy option.
                let wins = match high {
                    None => true,
                    Some(current) => {
                        score > high_score
                            || (score == high_score
                                && E::lesser(&item.burden, &decision.items[current].burden))
                    }
                };
                if wins {
                    high = Some(index);
                    high_score = score;
                }
            }
            // No possible option at all: fall back to the easy one; the
            // lightest shortcut will report the failure.
            decision.choice_high = high.unwrap_or(decision.choice_easy);
            highest.add(&decision.items[decision.choice_high]);
        }

        self.stats.lightest = lightest;
        self.stats.highest = highest;
    }

    /// Main pass: for every decision prefix, the lightest net burden per
    /// reachable net score.
    fn compute_minimums(&mut self, decisions: &[Decision<E>], capacity: &E::Capacity) {
        self.minimums.clear();
        self.previous.clear();
        self.current.clear();
        self.current
            .reserve(self.stats.highest.net_score.max(0) as usize + 1);

        for (row, &decision_index) in self.order.iter().enumerate() {
            let decision = &decisions[decision_index];

            for (choice, item) in decision.items.iter().enumerate() {
                // Negative scores can never be on an optimal path given the
                // quantization baseline; impossible burdens only enter via
                // the lightest fallback.
                if item.score < 0 || !E::is_possible(&item.burden) {
                    continue;
                }

                if row == 0 {
                    self.stats.iterations += 1;
                    Self::consider(
                        &mut self.current,
                        capacity,
                        Minimum {
                            net_score: item.score,
                            net_burden: item.burden,
                            choice: Some(choice),
                        },
                    );
                } else {
                    for base in &self.previous {
                        self.stats.iterations += 1;
                        Self::consider(
                            &mut self.current,
                            capacity,
                            Minimum {
                                net_score: base.net_score + item.score,
                                net_burden: base.net_burden + item.burden,
                                choice: Some(choice),
                            },
                        );
                    }
                }
            }

            // Spill the validated row, in score order, into the table.
            self.previous.clear();
            for minimum in &self.current {
                if minimum.valid() {
                    self.previous.push(*minimum);
                    self.minimums.store.push(*minimum);
                }
            }
            self.minimums.row_end.push(self.minimums.store.len());
            self.current.clear();
        }
    }

    /// Keep the lightest entrant per score; candidates over capacity are
    /// rejected outright.
    fn consider(
        current: &mut Vec<Minimum<E::Burden>>,
        capacity: &E::Capacity,
        candidate: Minimum<E::Burden>,
    ) {
        if !E::acceptable(&candidate.net_burden, capacity) {
            return;
        }
        let slot_index = candidate.net_score as usize;
        if slot_index >= current.len() {
            current.resize(slot_index + 1, invalid_minimum::<E>());
        }
        let slot = &mut current[slot_index];
        if E::lesser(&candidate.net_burden, &slot.net_burden) {
            *slot = candidate;
        }
    }
}

fn zero_stats<E: Economy>() -> NetStats<E::Burden> {
    NetStats {
        net_burden: E::zero(),
        net_value: 0.0,
        net_score: 0,
    }
}
