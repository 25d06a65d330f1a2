mod cpu_tests;
mod parser_tests;
mod target_tests;
