//! Named, typed, externally adjustable parameters
//!
//! UI controls publish new values at any point during a frame; the driver
//! applies everything pending once, at the start of the next tick, so a
//! whole step cycle observes one consistent snapshot. Last write wins.

use crate::error::{Result, RippleError};

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Number(f64),
    Boolean(bool),
    /// Linear RGB.
    Color([f32; 3]),
    /// Index into the registered option list.
    Choice(usize),
}

impl ParamValue {
    fn kind_name(&self) -> &'static str {
        match self {
            ParamValue::Number(_) => "number",
            ParamValue::Boolean(_) => "boolean",
            ParamValue::Color(_) => "color",
            ParamValue::Choice(_) => "choice",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ParamKind {
    Number { min: f64, max: f64, step: f64 },
    Boolean,
    Color,
    Choice { options: Vec<String> },
    /// Momentary button; carries no value, only fire events.
    Action,
}

impl ParamKind {
    fn kind_name(&self) -> &'static str {
        match self {
            ParamKind::Number { .. } => "number",
            ParamKind::Boolean => "boolean",
            ParamKind::Color => "color",
            ParamKind::Choice { .. } => "choice",
            ParamKind::Action => "action",
        }
    }
}

pub struct ParamEntry {
    pub name: String,
    pub label: String,
    pub kind: ParamKind,
    value: ParamValue,
    pending: Option<ParamValue>,
    changed: bool,
    pending_fires: u32,
    fired: bool,
}

impl ParamEntry {
    /// The value the current frame's snapshot holds. The UI also renders
    /// from this, so a widget reflects a published value only after the
    /// driver applied it.
    pub fn value(&self) -> &ParamValue {
        &self.value
    }
}

#[derive(Default)]
pub struct ParameterBus {
    // Insertion order doubles as panel order.
    entries: Vec<ParamEntry>,
}

impl ParameterBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&mut self, name: &str, label: &str, kind: ParamKind, value: ParamValue) {
        debug_assert!(
            self.index(name).is_err(),
            "parameter '{name}' registered twice"
        );
        self.entries.push(ParamEntry {
            name: name.to_string(),
            label: label.to_string(),
            kind,
            value,
            pending: None,
            changed: false,
            pending_fires: 0,
            fired: false,
        });
    }

    pub fn register_number(
        &mut self,
        name: &str,
        label: &str,
        default: f64,
        min: f64,
        max: f64,
        step: f64,
    ) {
        self.register(
            name,
            label,
            ParamKind::Number { min, max, step },
            ParamValue::Number(default),
        );
    }

    pub fn register_boolean(&mut self, name: &str, label: &str, default: bool) {
        self.register(name, label, ParamKind::Boolean, ParamValue::Boolean(default));
    }

    pub fn register_color(&mut self, name: &str, label: &str, default: [f32; 3]) {
        self.register(name, label, ParamKind::Color, ParamValue::Color(default));
    }

    pub fn register_choice(&mut self, name: &str, label: &str, default: usize, options: &[&str]) {
        self.register(
            name,
            label,
            ParamKind::Choice {
                options: options.iter().map(|s| s.to_string()).collect(),
            },
            ParamValue::Choice(default),
        );
    }

    pub fn register_action(&mut self, name: &str, label: &str) {
        self.register(name, label, ParamKind::Action, ParamValue::Boolean(false));
    }

    fn index(&self, name: &str) -> Result<usize> {
        self.entries
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| RippleError::UnknownParam(name.to_string()))
    }

    /// Queue a new value; it becomes visible at the next `apply_pending`.
    /// Numbers clamp to their registered range.
    pub fn publish(&mut self, name: &str, value: ParamValue) -> Result<()> {
        let i = self.index(name)?;
        let entry = &mut self.entries[i];
        let value = match (&entry.kind, value) {
            (ParamKind::Number { min, max, .. }, ParamValue::Number(v)) => {
                ParamValue::Number(v.clamp(*min, *max))
            }
            (ParamKind::Boolean, v @ ParamValue::Boolean(_)) => v,
            (ParamKind::Color, v @ ParamValue::Color(_)) => v,
            (ParamKind::Choice { options }, ParamValue::Choice(c)) => {
                ParamValue::Choice(c.min(options.len().saturating_sub(1)))
            }
            (kind, value) => {
                return Err(RippleError::ParamKind {
                    name: name.to_string(),
                    expected: kind.kind_name(),
                    actual: value.kind_name(),
                })
            }
        };
        entry.pending = Some(value);
        Ok(())
    }

    /// Fire a momentary action (button press).
    pub fn fire(&mut self, name: &str) -> Result<()> {
        let i = self.index(name)?;
        match self.entries[i].kind {
            ParamKind::Action => {
                self.entries[i].pending_fires += 1;
                Ok(())
            }
            ref kind => Err(RippleError::ParamKind {
                name: name.to_string(),
                expected: "action",
                actual: kind.kind_name(),
            }),
        }
    }

    /// Apply everything published since the previous apply. Called by the
    /// app once per frame before any pass runs; never mid-step.
    pub fn apply_pending(&mut self) {
        for entry in &mut self.entries {
            entry.changed = false;
            entry.fired = entry.pending_fires > 0;
            entry.pending_fires = 0;
            if let Some(value) = entry.pending.take() {
                if value != entry.value {
                    log::debug!("param '{}' -> {:?}", entry.name, value);
                    entry.value = value;
                    entry.changed = true;
                }
            }
        }
    }

    /// Whether the last `apply_pending` changed this entry's value.
    pub fn changed(&self, name: &str) -> bool {
        self.index(name)
            .map(|i| self.entries[i].changed)
            .unwrap_or(false)
    }

    /// Whether the last `apply_pending` consumed at least one fire.
    pub fn fired(&self, name: &str) -> bool {
        self.index(name)
            .map(|i| self.entries[i].fired)
            .unwrap_or(false)
    }

    pub fn number(&self, name: &str) -> Result<f64> {
        let i = self.index(name)?;
        match self.entries[i].value {
            ParamValue::Number(v) => Ok(v),
            ref v => Err(self.kind_error(i, "number", v.kind_name())),
        }
    }

    pub fn boolean(&self, name: &str) -> Result<bool> {
        let i = self.index(name)?;
        match self.entries[i].value {
            ParamValue::Boolean(v) => Ok(v),
            ref v => Err(self.kind_error(i, "boolean", v.kind_name())),
        }
    }

    pub fn color(&self, name: &str) -> Result<[f32; 3]> {
        let i = self.index(name)?;
        match self.entries[i].value {
            ParamValue::Color(v) => Ok(v),
            ref v => Err(self.kind_error(i, "color", v.kind_name())),
        }
    }

    pub fn choice(&self, name: &str) -> Result<usize> {
        let i = self.index(name)?;
        match self.entries[i].value {
            ParamValue::Choice(v) => Ok(v),
            ref v => Err(self.kind_error(i, "choice", v.kind_name())),
        }
    }

    fn kind_error(&self, i: usize, expected: &'static str, actual: &'static str) -> RippleError {
        RippleError::ParamKind {
            name: self.entries[i].name.clone(),
            expected,
            actual,
        }
    }

    pub fn entries(&self) -> &[ParamEntry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [ParamEntry] {
        &mut self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn published_values_wait_for_the_tick_boundary() {
        let mut bus = ParameterBus::new();
        bus.register_number("speed", "Speed", 10.0, 0.1, 60.0, 0.1);

        bus.publish("speed", ParamValue::Number(20.0)).unwrap();
        assert_eq!(bus.number("speed").unwrap(), 10.0);

        bus.apply_pending();
        assert_eq!(bus.number("speed").unwrap(), 20.0);
        assert!(bus.changed("speed"));

        bus.apply_pending();
        assert!(!bus.changed("speed"));
    }

    #[test]
    fn last_write_wins_within_a_frame() {
        let mut bus = ParameterBus::new();
        bus.register_number("n", "N", 1.0, 0.0, 100.0, 1.0);
        bus.publish("n", ParamValue::Number(3.0)).unwrap();
        bus.publish("n", ParamValue::Number(7.0)).unwrap();
        bus.apply_pending();
        assert_eq!(bus.number("n").unwrap(), 7.0);
    }

    #[test]
    fn numbers_clamp_to_their_range() {
        let mut bus = ParameterBus::new();
        bus.register_number("damping", "Damping", 1.0, 0.1, 30.0, 0.1);
        bus.publish("damping", ParamValue::Number(500.0)).unwrap();
        bus.apply_pending();
        assert_eq!(bus.number("damping").unwrap(), 30.0);
    }

    #[test]
    fn kind_mismatch_is_a_descriptive_error() {
        let mut bus = ParameterBus::new();
        bus.register_boolean("wind", "Wind", true);
        let err = bus.publish("wind", ParamValue::Number(1.0)).unwrap_err();
        assert!(err.to_string().contains("wind"));
        assert!(bus.number("wind").is_err());
        assert!(bus.number("missing").is_err());
    }

    #[test]
    fn actions_fire_once_per_apply() {
        let mut bus = ParameterBus::new();
        bus.register_action("restart", "Restart");
        assert!(!bus.fired("restart"));

        bus.fire("restart").unwrap();
        assert!(!bus.fired("restart"));
        bus.apply_pending();
        assert!(bus.fired("restart"));
        bus.apply_pending();
        assert!(!bus.fired("restart"));
    }
}
