pub mod footprint;
