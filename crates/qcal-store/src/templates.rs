//! Schedule templates for the qutrit gate set.
//!
//! A template is a pulse shape whose fields are [`ParameterExpression`]s
//! over named symbols. Each symbol is owned by a store schedule (so `y12`
//! reads the amplitude calibrated for `x12`) or is supplied by the caller
//! (the `rz12` angle). Resolution binds every symbol and returns a fresh,
//! concrete [`Schedule`]; the templates themselves hold no state.

use std::collections::BTreeMap;
use std::f64::consts::FRAC_PI_2;

use chrono::{DateTime, Utc};

use qcal_ir::{IrError, NativeGate, ParameterExpression, Schedule, StimulusProgram, Waveform};

use crate::error::{StoreError, StoreResult};
use crate::key::{ParameterKey, Provenance};
use crate::store::CalibrationStore;

/// Where a template symbol gets its value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamSource {
    /// Current store value of `(symbol, [qubit], schedule)`.
    Store {
        /// Owning schedule of the parameter.
        schedule: Option<String>,
    },
    /// Must be passed as an override at resolution time.
    Argument,
}

impl ParamSource {
    fn store(schedule: &str) -> Self {
        ParamSource::Store {
            schedule: Some(schedule.to_string()),
        }
    }
}

/// Shape of a template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateBody {
    /// A DRAG pulse on the qutrit channel.
    Drag {
        /// Length in samples.
        duration: ParameterExpression,
        /// Peak amplitude.
        amp: ParameterExpression,
        /// Gaussian width.
        sigma: ParameterExpression,
        /// DRAG coefficient.
        beta: ParameterExpression,
        /// Rotation axis angle.
        angle: ParameterExpression,
    },
    /// A frame change on the qutrit channel.
    Phase {
        /// Phase added to the frame.
        phase: ParameterExpression,
    },
}

impl TemplateBody {
    fn expressions(&self) -> Vec<&ParameterExpression> {
        match self {
            TemplateBody::Drag {
                duration,
                amp,
                sigma,
                beta,
                angle,
            } => vec![duration, amp, sigma, beta, angle],
            TemplateBody::Phase { phase } => vec![phase],
        }
    }
}

/// A named, parameterized pulse schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleTemplate {
    /// Gate name.
    pub name: String,
    /// Pulse shape.
    pub body: TemplateBody,
    /// Source of every free symbol.
    pub sources: BTreeMap<String, ParamSource>,
}

impl ScheduleTemplate {
    /// Free symbols of the template, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .body
            .expressions()
            .into_iter()
            .flat_map(ParameterExpression::symbols)
            .collect();
        out.sort();
        out.dedup();
        out
    }

    fn drag(name: &str, angle_offset: f64, owners: &[(&str, &str)]) -> Self {
        let sym = ParameterExpression::symbol;
        let angle = if angle_offset == 0.0 {
            sym("angle")
        } else {
            sym("angle") + ParameterExpression::constant(angle_offset)
        };
        Self {
            name: name.to_string(),
            body: TemplateBody::Drag {
                duration: sym("duration"),
                amp: sym("amp"),
                sigma: sym("σ"),
                beta: sym("β"),
                angle,
            },
            sources: owners
                .iter()
                .map(|(symbol, owner)| ((*symbol).to_string(), ParamSource::store(owner)))
                .collect(),
        }
    }

    fn phase(name: &str) -> Self {
        Self {
            name: name.to_string(),
            body: TemplateBody::Phase {
                phase: -ParameterExpression::symbol("θ"),
            },
            sources: BTreeMap::from([("θ".to_string(), ParamSource::Argument)]),
        }
    }
}

/// The gate template library with its default parameter values.
#[derive(Debug, Clone)]
pub struct TemplateLibrary {
    templates: BTreeMap<String, ScheduleTemplate>,
    defaults: Vec<(ParameterKey, f64)>,
}

impl Default for TemplateLibrary {
    fn default() -> Self {
        let x12_owned = [
            ("duration", "x12"),
            ("amp", "x12"),
            ("σ", "x12"),
            ("β", "x12"),
            ("angle", "x12"),
        ];
        let sx12_owned = [
            ("duration", "x12"),
            ("amp", "sx12"),
            ("σ", "x12"),
            ("β", "sx12"),
            ("angle", "sx12"),
        ];

        let templates = [
            ScheduleTemplate::drag("x12", 0.0, &x12_owned),
            ScheduleTemplate::drag("y12", FRAC_PI_2, &x12_owned),
            ScheduleTemplate::drag("sx12", 0.0, &sx12_owned),
            ScheduleTemplate::drag("sy12", FRAC_PI_2, &sx12_owned),
            ScheduleTemplate::phase("rz12"),
        ]
        .into_iter()
        .map(|t| (t.name.clone(), t))
        .collect();

        let x12 = Some("x12");
        let sx12 = Some("sx12");
        let defaults = vec![
            (ParameterKey::default_scope("duration", x12), 160.0),
            (ParameterKey::default_scope("amp", x12), 0.14),
            (ParameterKey::default_scope("σ", x12), 40.0),
            (ParameterKey::default_scope("β", x12), 0.0),
            (ParameterKey::default_scope("angle", x12), 0.0),
            (ParameterKey::default_scope("amp", sx12), 0.07),
            (ParameterKey::default_scope("β", sx12), 0.0),
            (ParameterKey::default_scope("angle", sx12), 0.0),
            (ParameterKey::default_scope("α", None), -300e6),
        ];

        Self {
            templates,
            defaults,
        }
    }
}

impl TemplateLibrary {
    /// Look up a template.
    pub fn get(&self, name: &str) -> StoreResult<&ScheduleTemplate> {
        self.templates
            .get(name)
            .ok_or_else(|| StoreError::UnknownTemplate(name.to_string()))
    }

    /// Names of all templates.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Default parameter values.
    pub fn defaults(&self) -> &[(ParameterKey, f64)] {
        &self.defaults
    }

    /// Write the default values into a store.
    pub fn register_defaults(&self, store: &mut CalibrationStore, at: DateTime<Utc>) {
        for (key, value) in &self.defaults {
            store.add_value(key.clone(), *value, at, Provenance::default_value());
        }
    }

    /// Resolve a template into a concrete schedule on the qutrit channel.
    ///
    /// Each symbol takes its override if one is given, otherwise the store
    /// value of its owning key at `at`. A missing store value fails with
    /// [`StoreError::MissingParameter`].
    pub fn resolve(
        &self,
        name: &str,
        qubit: u32,
        store: &CalibrationStore,
        overrides: &BTreeMap<String, f64>,
        at: Option<DateTime<Utc>>,
    ) -> StoreResult<Schedule> {
        let template = self.get(name)?;
        let channel = store.qutrit_channel(qubit)?;

        let mut bound: BTreeMap<String, f64> = BTreeMap::new();
        for symbol in template.symbols() {
            let value = match (overrides.get(&symbol), template.sources.get(&symbol)) {
                (Some(v), _) => *v,
                (None, Some(ParamSource::Store { schedule })) => {
                    let key = ParameterKey::qubit(symbol.as_str(), qubit, schedule.as_deref());
                    store.get_current(&key, at)?
                }
                (None, _) => return Err(IrError::UnboundParameter(symbol).into()),
            };
            bound.insert(symbol, value);
        }

        let lookup = |s: &str| bound.get(s).copied();
        let schedule = Schedule::new(name);
        let schedule = match &template.body {
            TemplateBody::Drag {
                duration,
                amp,
                sigma,
                beta,
                angle,
            } => schedule.play(
                Waveform::Drag {
                    duration: duration.evaluate(&lookup)?.round().max(0.0) as u64,
                    amp: amp.evaluate(&lookup)?,
                    sigma: sigma.evaluate(&lookup)?,
                    beta: beta.evaluate(&lookup)?,
                    angle: angle.evaluate(&lookup)?,
                },
                channel,
            ),
            TemplateBody::Phase { phase } => schedule.shift_phase(phase.evaluate(&lookup)?, channel),
        };
        Ok(schedule)
    }

    /// Frame setup that tunes the qutrit channel to the 1–2 transition.
    ///
    /// The carrier is `f01 + α + detuning` with `f01` and `α` read from the
    /// store.
    pub fn qutrit_context(
        &self,
        store: &CalibrationStore,
        qubit: u32,
        detuning: f64,
        at: Option<DateTime<Utc>>,
    ) -> StoreResult<Schedule> {
        let channel = store.qutrit_channel(qubit)?;
        let f01 = store.get_current(&ParameterKey::qubit("drive_freq", qubit, None), at)?;
        let alpha = store.get_current(&ParameterKey::qubit("α", qubit, None), at)?;
        Ok(Schedule::new("qutrit_context").set_frequency(f01 + alpha + detuning, channel))
    }

    /// Full schedule for one EF gate: frequency setup then the gate pulse.
    pub fn resolve_gate(
        &self,
        gate: &NativeGate,
        qubit: u32,
        store: &CalibrationStore,
        at: Option<DateTime<Utc>>,
    ) -> StoreResult<Schedule> {
        if !gate.needs_calibration() {
            return Err(StoreError::UnknownTemplate(gate.name().to_string()));
        }
        let mut overrides = BTreeMap::new();
        if let Some(theta) = gate.angle() {
            overrides.insert("θ".to_string(), theta);
        }
        let pulse = self.resolve(gate.name(), qubit, store, &overrides, at)?;
        let context = self.qutrit_context(store, qubit, 0.0, at)?;
        let mut schedule = context.append(&pulse);
        schedule.name = gate.calibration_key();
        Ok(schedule)
    }

    /// Attach a schedule for every EF gate in `program` that has none.
    pub fn calibrate_program(
        &self,
        program: &mut StimulusProgram,
        store: &CalibrationStore,
        at: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        for gate in program.uncalibrated_gates() {
            let schedule = self.resolve_gate(&gate, program.qubit.0, store, at)?;
            program.add_calibration(&gate, schedule);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcal_hal::{Capabilities, Topology};
    use qcal_ir::{Channel, PulseOp, QubitId};

    fn setup() -> (TemplateLibrary, CalibrationStore) {
        let lib = TemplateLibrary::default();
        let caps = Capabilities::simulator(2);
        let store = CalibrationStore::from_backend(&caps, &lib);
        (lib, store)
    }

    fn drag_of(schedule: &Schedule) -> Waveform {
        schedule.waveforms().next().cloned().unwrap()
    }

    #[test]
    fn test_resolve_x12_defaults() {
        let (lib, store) = setup();
        let sched = lib.resolve("x12", 0, &store, &BTreeMap::new(), None).unwrap();
        assert_eq!(
            drag_of(&sched),
            Waveform::Drag {
                duration: 160,
                amp: 0.14,
                sigma: 40.0,
                beta: 0.0,
                angle: 0.0,
            }
        );
        assert_eq!(sched.ops[0].channel(), Channel::Control(0));
    }

    #[test]
    fn test_y12_shares_x12_with_offset() {
        let (lib, mut store) = setup();
        store.add_value(
            ParameterKey::qubit("amp", 1, Some("x12")),
            0.2,
            Utc::now(),
            Provenance::from_source("test"),
        );
        let y = lib.resolve("y12", 1, &store, &BTreeMap::new(), None).unwrap();
        let w = drag_of(&y);
        assert_eq!(w.amp(), 0.2);
        assert!((w.angle() - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_sx12_owns_amp_but_not_duration() {
        let (lib, mut store) = setup();
        store.add_value(
            ParameterKey::qubit("σ", 0, Some("x12")),
            32.0,
            Utc::now(),
            Provenance::from_source("test"),
        );
        let w = drag_of(&lib.resolve("sx12", 0, &store, &BTreeMap::new(), None).unwrap());
        assert_eq!(w.amp(), 0.07);
        assert_eq!(w.sigma(), 32.0);
        assert_eq!(w.duration(), 160);
    }

    #[test]
    fn test_overrides_win() {
        let (lib, store) = setup();
        let overrides = BTreeMap::from([("β".to_string(), -1.2), ("amp".to_string(), 0.3)]);
        let w = drag_of(&lib.resolve("x12", 0, &store, &overrides, None).unwrap());
        assert_eq!(w.beta(), -1.2);
        assert_eq!(w.amp(), 0.3);
    }

    #[test]
    fn test_missing_parameter_propagates() {
        let lib = TemplateLibrary::default();
        let mut store = CalibrationStore::new("bare");
        // Control lines only, no values.
        store.control_channels.insert(0, 0);
        let err = lib.resolve("x12", 0, &store, &BTreeMap::new(), None).unwrap_err();
        assert!(matches!(err, StoreError::MissingParameter { .. }));
    }

    #[test]
    fn test_rz12_needs_angle() {
        let (lib, store) = setup();
        let err = lib.resolve("rz12", 0, &store, &BTreeMap::new(), None).unwrap_err();
        assert!(matches!(err, StoreError::Ir(IrError::UnboundParameter(_))));

        let sched = lib
            .resolve_gate(&NativeGate::Rz12(0.5), 0, &store, None)
            .unwrap();
        assert!(matches!(
            sched.ops.last(),
            Some(PulseOp::ShiftPhase { phase, .. }) if (*phase + 0.5).abs() < 1e-12
        ));
    }

    #[test]
    fn test_qutrit_context_frequency() {
        let (lib, store) = setup();
        let ctx = lib.qutrit_context(&store, 1, 1.0e6, None).unwrap();
        let expected = 4.95e9 - 330e6 + 1.0e6;
        assert!(matches!(
            ctx.ops[0],
            PulseOp::SetFrequency { frequency, .. } if (frequency - expected).abs() < 1.0
        ));
    }

    #[test]
    fn test_blacklisted_qubit_cannot_resolve() {
        let lib = TemplateLibrary::default();
        let caps = Capabilities::simulator(3).with_topology(Topology::custom(vec![(0, 1)]));
        let store = CalibrationStore::from_backend(&caps, &lib);
        let err = lib.resolve("x12", 2, &store, &BTreeMap::new(), None).unwrap_err();
        assert!(matches!(err, StoreError::TopologyGap { qubit: 2 }));
    }

    #[test]
    fn test_calibrate_program() {
        let (lib, store) = setup();
        let mut prog = StimulusProgram::new("p", QubitId(0));
        prog.x()
            .gate(NativeGate::SX12)
            .gate(NativeGate::Rz12(0.25))
            .gate(NativeGate::SX12)
            .x()
            .measure();
        lib.calibrate_program(&mut prog, &store, None).unwrap();
        assert!(prog.validate().is_ok());
        assert_eq!(prog.calibrations.len(), 2);
    }

    #[test]
    fn test_unknown_template() {
        let (lib, store) = setup();
        assert!(matches!(
            lib.resolve("x13", 0, &store, &BTreeMap::new(), None),
            Err(StoreError::UnknownTemplate(_))
        ));
    }
}
