pub mod product_detector;
