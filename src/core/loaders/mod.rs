mod profile;

pub use profile::{LoaderArguments, LoaderKind, LoaderLibrary, LoaderProfile};
