//! Application-facing settings.
//!
//! A setting is a quality knob with a small set of discrete options. The
//! application owns the setting, feeds cost measurements into it, and the
//! controller writes the chosen option back after every decide. Costs are
//! never declared up front; the controller infers them from measurements
//! keyed by the setting's stable id.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::num::NonZeroU64;
use std::rc::Rc;

use crate::profile::Measurement;

/// Shared handle to a setting. The core is single-threaded cooperative, so
/// shared ownership is `Rc`, not `Arc`.
pub type SettingHandle = Rc<RefCell<dyn Setting>>;

/// Single-owner handshake between a setting and its controller.
///
/// Holds the owning controller's numeric id. The link carries no ownership
/// and no reference, so no cycle exists; it is cleared on unregister and
/// when the controller is dropped.
#[derive(Debug, Default)]
pub struct ControllerBinding {
    owner: Cell<Option<NonZeroU64>>,
}

impl ControllerBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any controller currently owns the setting.
    pub fn is_bound(&self) -> bool {
        self.owner.get().is_some()
    }

    pub(crate) fn owner(&self) -> Option<NonZeroU64> {
        self.owner.get()
    }

    pub(crate) fn bind(&self, id: NonZeroU64) {
        self.owner.set(Some(id));
    }

    pub(crate) fn release(&self) {
        self.owner.set(None);
    }
}

/// A controllable quality setting.
pub trait Setting {
    /// Stable identifier used to key profile data. Must not contain
    /// control characters or double quotes (the persisted form forbids
    /// them).
    fn id(&self) -> &str;

    /// Subjective value of each selectable option. The slice length fixes
    /// the option count for the lifetime of the id.
    fn option_values(&self) -> &[f64];

    /// Option applied while no measurement data exists.
    fn choice_default(&self) -> usize {
        0
    }

    /// Pull one pending measurement; `None` means the queue is drained.
    fn poll_measurement(&mut self) -> Option<Measurement>;

    /// Called by the controller after every decide with the chosen option.
    fn choice_set(&mut self, choice: usize);

    /// The single-owner link cell. Implementations embed a
    /// [`ControllerBinding`] and return it here.
    fn binding(&self) -> &ControllerBinding;
}

/// Ready-made setting backed by a fixed option array and a FIFO
/// measurement queue.
#[derive(Debug)]
pub struct ArraySetting {
    id: String,
    values: Vec<f64>,
    choice_default: usize,
    choice_current: usize,
    queue: VecDeque<Measurement>,
    binding: ControllerBinding,
}

impl ArraySetting {
    /// # Panics
    ///
    /// Panics if `values` is empty or `choice_default` is out of range.
    pub fn new(id: impl Into<String>, values: Vec<f64>, choice_default: usize) -> Self {
        let id = id.into();
        assert!(!values.is_empty(), "setting {id:?} has no options");
        assert!(
            choice_default < values.len(),
            "default choice {choice_default} out of range for setting {id:?}"
        );
        Self {
            id,
            values,
            choice_default,
            choice_current: choice_default,
            queue: VecDeque::new(),
            binding: ControllerBinding::new(),
        }
    }

    /// A setting with exactly one option: an unavoidable burden or a fixed
    /// incentive.
    pub fn fixed(id: impl Into<String>, value: f64) -> Self {
        Self::new(id, vec![value], 0)
    }

    /// An on/off setting; option 0 is off, option 1 is on.
    pub fn on_off(id: impl Into<String>, value_on: f64, value_off: f64, default_on: bool) -> Self {
        Self::new(id, vec![value_off, value_on], usize::from(default_on))
    }

    /// Wrap into the shared form the controller registers.
    pub fn into_handle(self) -> Rc<RefCell<ArraySetting>> {
        Rc::new(RefCell::new(self))
    }

    /// The option currently applied.
    pub fn choice_current(&self) -> usize {
        self.choice_current
    }

    /// Queue a cost observation for the currently applied option.
    pub fn submit(&mut self, burden: f64) {
        self.queue.push_back(Measurement {
            choice: self.choice_current,
            burden,
        });
    }

    /// Queue a cost observation for an explicit option index.
    pub fn submit_for(&mut self, choice: usize, burden: f64) {
        assert!(
            choice < self.values.len(),
            "choice {choice} out of range for setting {:?}",
            self.id
        );
        self.queue.push_back(Measurement { choice, burden });
    }

    pub fn pending_measurements(&self) -> usize {
        self.queue.len()
    }
}

impl Setting for ArraySetting {
    fn id(&self) -> &str {
        &self.id
    }

    fn option_values(&self) -> &[f64] {
        &self.values
    }

    fn choice_default(&self) -> usize {
        self.choice_default
    }

    fn poll_measurement(&mut self) -> Option<Measurement> {
        self.queue.pop_front()
    }

    fn choice_set(&mut self, choice: usize) {
        assert!(
            choice < self.values.len(),
            "choice {choice} out of range for setting {:?}",
            self.id
        );
        self.choice_current = choice;
    }

    fn binding(&self) -> &ControllerBinding {
        &self.binding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_setting_queue_is_fifo() {
        let mut setting = ArraySetting::new("shadows", vec![0.0, 5.0, 9.0], 1);
        assert_eq!(setting.choice_current(), 1);

        setting.submit(2.0);
        setting.choice_set(2);
        setting.submit(4.0);
        assert_eq!(setting.pending_measurements(), 2);

        let first = setting.poll_measurement().unwrap();
        assert_eq!(first.choice, 1);
        assert_eq!(first.burden, 2.0);
        let second = setting.poll_measurement().unwrap();
        assert_eq!(second.choice, 2);
        assert_eq!(second.burden, 4.0);
        assert!(setting.poll_measurement().is_none());
    }

    #[test]
    fn test_on_off_layout() {
        let off_default = ArraySetting::on_off("bloom", 6.0, 0.0, false);
        assert_eq!(off_default.option_values(), &[0.0, 6.0]);
        assert_eq!(off_default.choice_default(), 0);

        let on_default = ArraySetting::on_off("bloom", 6.0, 0.0, true);
        assert_eq!(on_default.choice_default(), 1);
    }

    #[test]
    fn test_fixed_single_option() {
        let fixed = ArraySetting::fixed("hud", 1.0);
        assert_eq!(fixed.option_values().len(), 1);
        assert_eq!(fixed.choice_default(), 0);
    }

    #[test]
    #[should_panic(expected = "no options")]
    fn test_empty_values_panics() {
        let _ = ArraySetting::new("empty", vec![], 0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_bad_default_panics() {
        let _ = ArraySetting::new("bad", vec![1.0], 3);
    }

    #[test]
    fn test_binding_lifecycle() {
        let binding = ControllerBinding::new();
        assert!(!binding.is_bound());

        let id = NonZeroU64::new(7).unwrap();
        binding.bind(id);
        assert!(binding.is_bound());
        assert_eq!(binding.owner(), Some(id));

        binding.release();
        assert!(!binding.is_bound());
    }
}
