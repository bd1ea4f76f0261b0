mod execution_engine_test;
