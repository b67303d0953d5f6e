mod cycle;
mod data_path;
mod helpers;
