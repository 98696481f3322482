// Property-based tests harness
mod strategies;
mod layout {
    include!("layout.rs");
}
mod access {
    include!("access.rs");
}
mod slices {
    include!("slices.rs");
}
