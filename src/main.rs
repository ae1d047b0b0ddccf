fn main() {
    env_logger::init();
    retrobasic::term::main();
}
