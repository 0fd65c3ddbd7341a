pub mod casefile;
