fn main() {
    careroute_lib::run();
}
