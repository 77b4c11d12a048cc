pub mod rgce_builder;
