//! Store access for genes-rewrite
//!
//! Narrow by construction: the pipeline reads pending `cultivar` rows and
//! writes only the named target columns plus their `cultivar_history` audit
//! rows. Schema ownership stays with the register web application.

pub mod cultivars;
