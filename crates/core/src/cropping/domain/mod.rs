pub mod crop_calculator;
