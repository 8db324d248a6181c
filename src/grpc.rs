tonic::include_proto!("classifier");
