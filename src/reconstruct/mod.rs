//! Rebuilds solids from CAD sequences by sketch–extrude–boolean steps.

pub mod profile;

pub use profile::{Profile, ProfileLoop, Segment};

use tracing::{debug, info};

use crate::error::{Error, MeshingError, ReconstructionError, Result};
use crate::geometry::Frame;
use crate::math::VOLUME_TOLERANCE;
use crate::operations::boolean::{mesh_boolean, BooleanOp};
use crate::operations::shaping::SweepProfile;
use crate::sequence::{BooleanKind, CadSequence};
use crate::tessellation::{TessellateSolid, TessellationParams, TriangleMesh};
use crate::topology::{SolidId, TopologyStore};
use crate::validity::{check_profile, ValidityWarning};

/// One swept profile and the way it combines with the features before it.
#[derive(Debug, Clone)]
pub struct Feature {
    /// Index of the extrude operation that produced this feature.
    pub operation: usize,
    /// The exact swept B-rep in the body's store.
    pub solid: SolidId,
    /// Combination with the preceding features.
    pub op: BooleanOp,
    /// Boolean kind as written in the sequence.
    pub kind: BooleanKind,
    /// The swept profile, in sketch coordinates.
    pub profile: Profile,
    /// Placement of the profile.
    pub frame: Frame,
}

/// A non-empty reconstructed body.
#[derive(Debug, Clone)]
pub struct Body {
    store: TopologyStore,
    features: Vec<Feature>,
    mesh: TriangleMesh,
    probe_volume: f64,
}

impl Body {
    /// The arena holding every feature's B-rep.
    #[must_use]
    pub fn store(&self) -> &TopologyStore {
        &self.store
    }

    /// Features in sequence order.
    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Volume measured by the last probe tessellation.
    #[must_use]
    pub fn probe_volume(&self) -> f64 {
        self.probe_volume
    }

    /// Every feature's mesh combined in sequence order, at the
    /// reconstructor's deflection.
    #[must_use]
    pub fn mesh(&self) -> &TriangleMesh {
        &self.mesh
    }
}

/// A reconstructed solid. Immutable once built.
#[derive(Debug, Clone)]
pub enum Solid {
    Empty,
    Body(Body),
}

impl Solid {
    /// Whether the solid has no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Builds solids from CAD sequences.
#[derive(Debug, Clone, Copy)]
pub struct Reconstructor {
    probe: TessellationParams,
}

impl Default for Reconstructor {
    fn default() -> Self {
        Self {
            probe: TessellationParams::default(),
        }
    }
}

impl Reconstructor {
    /// Creates a reconstructor whose zero-volume probe meshes at
    /// `probe_deflection`.
    ///
    /// # Errors
    ///
    /// Returns [`MeshingError::InvalidDeflection`] for a non-positive value.
    pub fn new(probe_deflection: f64) -> Result<Self> {
        Ok(Self {
            probe: TessellationParams::with_deflection(probe_deflection)?,
        })
    }

    /// Interprets every extrusion of `sequence` in order.
    ///
    /// The first extrusion seeds the body whatever its boolean kind; later
    /// ones are joined, cut or intersected. After each step the body is
    /// probed and must keep a positive volume.
    ///
    /// # Errors
    ///
    /// Returns a [`ReconstructionError`] for an empty sketch, a degenerate
    /// profile, a zero extrusion distance or a combination that leaves no
    /// volume. A profile whose loops cross themselves or each other cannot
    /// be swept and fails with [`Error::InvalidProfile`].
    pub fn reconstruct(&self, sequence: &CadSequence) -> Result<Solid> {
        let mut store = TopologyStore::new();
        let mut features: Vec<Feature> = Vec::new();
        let mut probe: Option<TriangleMesh> = None;

        for (operation, extrude, sketch) in sequence.extrusions() {
            let profile = Profile::from_sketch(sketch, operation)?;
            if let Some(issue) = check_profile(&profile)
                .into_iter()
                .find(crate::validity::ValidityIssue::is_fatal_for_profile)
            {
                return Err(Error::InvalidProfile(ValidityWarning {
                    operation: Some(operation),
                    issue,
                }));
            }
            let (low, high) = extrude.span();
            let (low, high) = (low * sketch.scale, high * sketch.scale);
            if high - low <= crate::math::TOLERANCE {
                return Err(ReconstructionError::ZeroDistance { operation }.into());
            }
            let frame = sketch.plane.frame();
            let solid = SweepProfile::new(&profile, &frame, low, high).execute(&mut store)?;

            let op = if features.is_empty() {
                BooleanOp::Union
            } else {
                match extrude.boolean {
                    BooleanKind::NewBody | BooleanKind::Join => BooleanOp::Union,
                    BooleanKind::Cut => BooleanOp::Subtract,
                    BooleanKind::Intersect => BooleanOp::Intersect,
                }
            };

            let mesh = TessellateSolid::new(solid, self.probe)
                .execute(&store)
                .map_err(|e| probe_failure(operation, &e))?;
            let combined = match probe.take() {
                None => mesh,
                Some(acc) => mesh_boolean(&acc, &mesh, op),
            };
            let volume = combined.signed_volume();
            debug!(operation, ?op, volume, "feature combined");
            if volume <= VOLUME_TOLERANCE {
                return Err(ReconstructionError::ZeroVolume { operation }.into());
            }
            probe = Some(combined);

            features.push(Feature {
                operation,
                solid,
                op,
                kind: extrude.boolean,
                profile,
                frame,
            });
        }

        let Some(probe) = probe else {
            debug!("sequence has no extrusions, solid is empty");
            return Ok(Solid::Empty);
        };
        info!(features = features.len(), volume = probe.signed_volume(), "solid reconstructed");
        Ok(Solid::Body(Body {
            store,
            features,
            probe_volume: probe.signed_volume(),
            mesh: probe,
        }))
    }
}

fn probe_failure(operation: usize, error: &Error) -> Error {
    match error {
        Error::Meshing(MeshingError::NoTriangles) => {
            ReconstructionError::ZeroVolume { operation }.into()
        }
        other => ReconstructionError::Probe {
            operation,
            reason: other.to_string(),
        }
        .into(),
    }
}
