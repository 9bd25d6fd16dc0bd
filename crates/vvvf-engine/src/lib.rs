//! VVVF Inverter Engine
//!
//! This crate turns a [`vvvf_spec::PatternConfig`] and an advancing simulated
//! time into the switching state of a three-phase traction inverter, sample by
//! sample, and drives an induction motor model from it.
//!
//! # Overview
//!
//! Each sample goes through the same pipeline:
//!
//! - **Control** - the mascon state machine moves the commanded, sine and
//!   control frequencies under acceleration, braking and free-run
//! - **Values** - the active pattern entry is compiled into amplitude, carrier
//!   frequency, pulse data and resolved harmonics
//! - **Waveform** - each leg compares its reference against the carrier, or
//!   reads a switch-angle table
//! - **Motor** - a d-q induction motor integrates the resulting voltages
//!
//! The same pipeline backs batch rendering and Fourier analysis.
//!
//! # Determinism
//!
//! Given the same pattern, program, tables and seed, a render is identical
//! across runs. Carrier randomization draws from a PCG32 stream whose seed is
//! derived from the run seed with BLAKE3.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::atomic::AtomicBool;
//! use vvvf_engine::{render_program, TableLibrary};
//! use vvvf_spec::{MasconPoint, MasconProgram, PatternConfig, SimulationSettings};
//!
//! let pattern = PatternConfig::load(path)?;
//! let program = MasconProgram {
//!     initial_frequency: 0.0,
//!     points: vec![MasconPoint::accelerate(10.0, 6.0), MasconPoint::coast(2.0)],
//! };
//! let output = render_program(
//!     &pattern,
//!     &TableLibrary::new(),
//!     &program,
//!     &SimulationSettings::default(),
//!     None,
//!     &AtomicBool::new(false),
//! )?;
//! println!("PCM hash: {}", output.pcm_hash);
//! ```
//!
//! # Crate Structure
//!
//! - [`control`] - Mascon state machine
//! - [`timeline`] - Scripted mascon programs
//! - [`values`] - Per-sample pattern compilation
//! - [`waveform`] - Leg synthesis, SVM and discontinuous PWM
//! - [`carrier`] - Random and periodic carrier modulation
//! - [`custom_table`] - Switch-angle tables and their binary format
//! - [`delta_sigma`] - First-order delta-sigma quantizer
//! - [`motor`] - Induction motor model
//! - [`fourier`] - Harmonic analysis and amplitude search
//! - [`simulator`] - Per-sample pipeline
//! - [`render`] - Batch rendering with cancellation
//! - [`math`] - Wave helpers and root finders
//! - [`rng`] - Deterministic RNG with seed derivation

pub mod carrier;
pub mod control;
pub mod custom_table;
pub mod delta_sigma;
pub mod error;
pub mod fourier;
pub mod math;
pub mod motor;
pub mod render;
pub mod rng;
pub mod simulator;
pub mod state;
pub mod timeline;
pub mod values;
pub mod waveform;

pub use control::{advance, Command, FrequencyTarget};
pub use custom_table::{CustomPwmTable, TableKey, TableKind, TableLibrary};
pub use error::{EngineError, EngineResult};
pub use fourier::{
    solve_amplitude, synthesize_cycle, AnalysisContext, CycleRequest, FourierCoefficient,
    SolveMethod, SolveOptions,
};
pub use math::RootResult;
pub use motor::{InductionMotor, MotorState};
pub use render::{render_program, RenderOutput};
pub use simulator::{SampleOutput, Simulator};
pub use state::ControlState;
pub use timeline::{Segment, Timeline};
pub use values::{calculate_values, PwmCalculateValues};
pub use waveform::{calculate_phases, PhaseFault, PhaseOutput, WaveValues};
