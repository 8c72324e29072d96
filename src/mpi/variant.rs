//! MPI family selection

use serde::{Deserialize, Serialize};
use std::fmt;

/// MPI family, selecting the launch strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MpiVariant {
    /// MPICH, MPICH2, MPICH-3 and Intel MPI
    Mpich,
    /// Microsoft MPI
    MsMpi,
    /// Open MPI and Bullx MPI
    OpenMpi,
    /// Blue Gene/P
    BlueGeneP,
    /// Blue Gene/Q
    BlueGeneQ,
    /// Platform MPI (formerly HP MPI)
    PlatformMpi,
    /// Bull MPIBULL2
    MpiBull2,
    /// Anything else
    #[default]
    Generic,
}

impl MpiVariant {
    /// Type labels and the family each one selects
    pub const LABELS: [(&'static str, MpiVariant); 10] = [
        ("MPICH", MpiVariant::Mpich),
        ("MPICH2", MpiVariant::Mpich),
        ("Intel_MPI", MpiVariant::Mpich),
        ("MSMPI", MpiVariant::MsMpi),
        ("OpenMPI", MpiVariant::OpenMpi),
        ("BullxMPI", MpiVariant::OpenMpi),
        ("BGP_MPI", MpiVariant::BlueGeneP),
        ("BGQ_MPI", MpiVariant::BlueGeneQ),
        ("Platform_MPI", MpiVariant::PlatformMpi),
        ("MPIBULL2", MpiVariant::MpiBull2),
    ];

    /// Family for a type label; unknown or empty labels are generic
    pub fn from_label(label: &str) -> Self {
        Self::LABELS
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, v)| *v)
            .unwrap_or(MpiVariant::Generic)
    }

    /// Get the family name
    pub fn name(&self) -> &'static str {
        match self {
            MpiVariant::Mpich => "MPICH",
            MpiVariant::MsMpi => "MS-MPI",
            MpiVariant::OpenMpi => "Open MPI",
            MpiVariant::BlueGeneP => "Blue Gene/P",
            MpiVariant::BlueGeneQ => "Blue Gene/Q",
            MpiVariant::PlatformMpi => "Platform MPI",
            MpiVariant::MpiBull2 => "MPIBULL2",
            MpiVariant::Generic => "generic",
        }
    }
}

impl fmt::Display for MpiVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
