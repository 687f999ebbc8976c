mod assembly;
mod data_source;
mod gene;
mod header;
mod interval;
mod position;
pub(crate) mod utils;

pub use assembly::GenomeAssembly;
pub use data_source::DataSourceVersion;
pub use gene::{AnnotatedGene, GeneAnnotation};
pub use header::{SaHeader, SupplementaryAnnotationHeader};
pub use interval::{Interval, ReportFor, SupplementaryInterval};
pub use position::{GlobalMajorAllele, InterimSaItem, InterimSaPosition, SaDataRecord, SaPosition};
