use kube::ResourceExt;
use snafu::Snafu;

use crate::crd::S3BucketClass;

#[derive(Debug, PartialEq, Snafu)]
pub enum Error {
    #[snafu(display("no S3BucketClass is marked as default"))]
    NoDefaultClass,

    #[snafu(display("more than one S3BucketClass is marked as default: {classes:?}"))]
    MultipleDefaultClasses { classes: Vec<String> },
}

/// Returns the single class marked as default.
pub fn select_default_class(classes: &[S3BucketClass]) -> Result<&S3BucketClass, Error> {
    let defaults: Vec<&S3BucketClass> = classes.iter().filter(|c| c.is_default()).collect();
    match defaults.as_slice() {
        [] => NoDefaultClassSnafu.fail(),
        [class] => Ok(*class),
        _ => MultipleDefaultClassesSnafu {
            classes: defaults.iter().map(|c| c.name_any()).collect::<Vec<_>>(),
        }
        .fail(),
    }
}
