pub mod test_network;
