//! Read-only access to the intermediate values of key generation, encryption and decryption.
//!
//! An [`Observer`] is handed a [`Snapshot`] after each internal stage.  Snapshots own copies of
//! the coefficients, so an observer can keep or render them but cannot reach back into the
//! computation.  Secret intermediates (the secret vector, noise and the decrypted message) are
//! included: the hook exists to show every step of the scheme, and it must only be attached in
//! demonstration settings.

use crate::algebra::{FieldElement, NttMatrix, NttPolynomial, NttVector, Polynomial, PolynomialVector};

/// The internal stage that produced a snapshot
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// The public matrix was expanded from its seed
    MatrixExpansion,
    /// Secret or error polynomials were drawn from the centered binomial distribution
    NoiseSampling,
    /// Values were moved into, or computed in, the NTT domain
    NttTransform,
    /// Values were moved back out of the NTT domain
    InverseNtt,
    /// Values were compressed to fewer bits per coefficient
    Compression,
    /// Values were decompressed back into the field
    Decompression,
}

/// Plain coefficient data captured at a stage
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SnapshotValue {
    /// A single ring element
    Polynomial(Vec<u16>),
    /// A module vector, one entry per ring element
    Vector(Vec<Vec<u16>>),
    /// A module matrix, stored by rows
    Matrix(Vec<Vec<Vec<u16>>>),
}

impl SnapshotValue {
    /// The number of ring elements captured
    pub fn polynomial_count(&self) -> usize {
        match self {
            Self::Polynomial(_) => 1,
            Self::Vector(v) => v.len(),
            Self::Matrix(m) => m.iter().map(Vec::len).sum(),
        }
    }
}

/// An immutable, named intermediate value
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    /// The stage that produced the value
    pub stage: Stage,
    /// The name of the value in the usual description of the scheme, e.g. `t_hat`
    pub label: &'static str,
    /// The coefficients
    pub value: SnapshotValue,
}

/// Receives snapshots of intermediate values
pub trait Observer {
    /// Snapshots are only built when this returns `true`
    fn enabled(&self) -> bool {
        true
    }

    /// Called once per captured value, in computation order
    fn observe(&mut self, snapshot: &Snapshot);
}

/// An observer that captures nothing
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn enabled(&self) -> bool {
        false
    }

    fn observe(&mut self, _snapshot: &Snapshot) {}
}

/// An observer that keeps every snapshot it is given
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    /// The snapshots received so far, oldest first
    pub snapshots: Vec<Snapshot>,
}

impl Recorder {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// The labels of the recorded snapshots, in order
    pub fn labels(&self) -> Vec<&'static str> {
        self.snapshots.iter().map(|s| s.label).collect()
    }

    /// The first snapshot with the given label
    pub fn get(&self, label: &str) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| s.label == label)
    }
}

impl Observer for Recorder {
    fn observe(&mut self, snapshot: &Snapshot) {
        self.snapshots.push(snapshot.clone());
    }
}

/// Conversion of algebra types into snapshot data
pub(crate) trait Capture {
    fn capture(&self) -> SnapshotValue;
}

fn coefficients(x: &[FieldElement]) -> Vec<u16> {
    x.iter().map(|c| c.0).collect()
}

impl Capture for Polynomial {
    fn capture(&self) -> SnapshotValue {
        SnapshotValue::Polynomial(coefficients(&self.0))
    }
}

impl Capture for NttPolynomial {
    fn capture(&self) -> SnapshotValue {
        SnapshotValue::Polynomial(coefficients(&self.0))
    }
}

impl Capture for PolynomialVector {
    fn capture(&self) -> SnapshotValue {
        SnapshotValue::Vector(self.0.iter().map(|p| coefficients(&p.0)).collect())
    }
}

impl Capture for NttVector {
    fn capture(&self) -> SnapshotValue {
        SnapshotValue::Vector(self.0.iter().map(|p| coefficients(&p.0)).collect())
    }
}

impl Capture for NttMatrix {
    fn capture(&self) -> SnapshotValue {
        SnapshotValue::Matrix(
            self.0
                .iter()
                .map(|row| row.0.iter().map(|p| coefficients(&p.0)).collect())
                .collect(),
        )
    }
}

/// Emit a snapshot of `value` if the observer wants one
pub(crate) fn emit(
    observer: &mut dyn Observer,
    stage: Stage,
    label: &'static str,
    value: &impl Capture,
) {
    if observer.enabled() {
        observer.observe(&Snapshot {
            stage,
            label,
            value: value.capture(),
        });
    }
}
