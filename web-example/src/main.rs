fn main() {
    #[cfg(target_arch = "wasm32")]
    {
        lodestone_web_example::main().expect("failed to mount the map view");
    }
}
