mod analyser;

pub use analyser::*;
