mod data_point;
pub use data_point::{DataPoint, DataPoints, data_points_from_pairs};

mod sorted_array;
pub use sorted_array::SortedArray;
