mod program_test;
