//! Command line front end for the bnd2 bundle and resource codecs

pub mod commands;
