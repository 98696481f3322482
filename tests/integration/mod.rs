// Integration tests harness
mod calls {
    include!("calls.rs");
}
mod structs {
    include!("structs.rs");
}
mod memory {
    include!("memory.rs");
}
