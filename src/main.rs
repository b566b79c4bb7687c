fn main() {
    yonix_lib::run()
}
