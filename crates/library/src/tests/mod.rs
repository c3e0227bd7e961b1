mod library_tests;
