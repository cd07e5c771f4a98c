pub mod box_file_detector;
