mod relation_test;
