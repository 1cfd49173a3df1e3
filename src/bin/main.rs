fn main() {
    progminer::main();
}
